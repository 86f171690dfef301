use std::env;

// Static description of the function this worker serves, read from the
// environment the host sets up before the process starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionConfig {
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_mb: u32,
    pub log_group_name: String,
    pub log_stream_name: String,
}

impl FunctionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Lookup-driven constructor so the parsing rules can be tested without
    // touching the process environment.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let memory_limit_mb = lookup("AWS_LAMBDA_FUNCTION_MEMORY_SIZE")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);

        Self {
            function_name: lookup("AWS_LAMBDA_FUNCTION_NAME").unwrap_or_default(),
            function_version: lookup("AWS_LAMBDA_FUNCTION_VERSION").unwrap_or_default(),
            memory_limit_mb,
            log_group_name: lookup("AWS_LAMBDA_LOG_GROUP_NAME").unwrap_or_default(),
            log_stream_name: lookup("AWS_LAMBDA_LOG_STREAM_NAME").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_fields() {
        let config = FunctionConfig::from_lookup(lookup_in(&[
            ("AWS_LAMBDA_FUNCTION_NAME", "resize-images"),
            ("AWS_LAMBDA_FUNCTION_VERSION", "$LATEST"),
            ("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", "512"),
            ("AWS_LAMBDA_LOG_GROUP_NAME", "/aws/lambda/resize-images"),
            ("AWS_LAMBDA_LOG_STREAM_NAME", "2023/11/14/[$LATEST]abc"),
        ]));

        assert_eq!(config.function_name, "resize-images");
        assert_eq!(config.function_version, "$LATEST");
        assert_eq!(config.memory_limit_mb, 512);
        assert_eq!(config.log_group_name, "/aws/lambda/resize-images");
        assert_eq!(config.log_stream_name, "2023/11/14/[$LATEST]abc");
    }

    #[test]
    fn missing_or_garbled_values_fall_back() {
        let config = FunctionConfig::from_lookup(lookup_in(&[(
            "AWS_LAMBDA_FUNCTION_MEMORY_SIZE",
            "lots",
        )]));
        assert_eq!(config, FunctionConfig::default());
    }
}
