use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        env::var("ENVIRONMENT")
            .ok()
            .and_then(|s| Self::try_from(s).ok())
            .unwrap_or(Environment::Development)
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `development` or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing_accepts_aliases() {
        assert_eq!(
            Environment::try_from("PROD".to_string()),
            Ok(Environment::Production)
        );
        assert_eq!(
            Environment::try_from("dev".to_string()),
            Ok(Environment::Development)
        );
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn test_environment_deserializes_lowercase() {
        let env: Environment = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(env, Environment::Production);
        assert_eq!(env.as_str(), "production");
    }
}
