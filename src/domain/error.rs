//! Domain error types.

/// Top-level error type for quantcrew.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("insufficient data for {symbol}: have {points} points, need {minimum}")]
    InsufficientData {
        symbol: String,
        points: usize,
        minimum: usize,
    },

    #[error("invalid parameters: {reason}")]
    Domain { reason: String },

    #[error("price history fetch failed for {symbol}: {reason}")]
    UpstreamData { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantError {
    pub fn domain(reason: impl Into<String>) -> Self {
        QuantError::Domain {
            reason: reason.into(),
        }
    }

    pub fn upstream(symbol: &str, reason: impl Into<String>) -> Self {
        QuantError::UpstreamData {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&QuantError> for std::process::ExitCode {
    fn from(err: &QuantError) -> Self {
        let code: u8 = match err {
            QuantError::Io(_) => 1,
            QuantError::ConfigParse { .. }
            | QuantError::ConfigMissing { .. }
            | QuantError::ConfigInvalid { .. } => 2,
            QuantError::UpstreamData { .. } => 3,
            QuantError::Domain { .. } => 4,
            QuantError::NoData { .. } | QuantError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = QuantError::InsufficientData {
            symbol: "AAPL".into(),
            points: 1,
            minimum: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for AAPL: have 1 points, need 2"
        );
    }

    #[test]
    fn domain_helper_builds_variant() {
        let err = QuantError::domain("volatility must be positive");
        assert!(matches!(err, QuantError::Domain { .. }));
        assert_eq!(
            err.to_string(),
            "invalid parameters: volatility must be positive"
        );
    }

    #[test]
    fn upstream_helper_keeps_symbol() {
        let err = QuantError::upstream("MSFT", "timeout");
        match err {
            QuantError::UpstreamData { symbol, reason } => {
                assert_eq!(symbol, "MSFT");
                assert_eq!(reason, "timeout");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn exit_codes_follow_taxonomy() {
        use std::process::ExitCode;

        let cases = [
            (QuantError::Io(std::io::Error::other("x")), ExitCode::from(1)),
            (
                QuantError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                },
                ExitCode::from(2),
            ),
            (QuantError::upstream("A", "down"), ExitCode::from(3)),
            (QuantError::domain("bad"), ExitCode::from(4)),
            (
                QuantError::NoData {
                    symbol: "A".into(),
                },
                ExitCode::from(5),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(&err)),
                format!("{:?}", expected)
            );
        }
    }
}
