use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Clone, Display, Error)]
pub enum ProviderError {
    #[display("asset symbol '{symbol}' not found")]
    UnknownAsset { symbol: String },
    #[display("request to {provider} failed")]
    Request { provider: String },
    #[display("failed to parse response from {provider}")]
    ResponseParse { provider: String },
    #[display("rate limit exceeded for {provider}")]
    RateLimit { provider: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum AnalysisError {
    #[display("insufficient data for analysis: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("market data provider failed")]
    Provider,
    #[display("invalid analysis settings")]
    InvalidSettings,
}

#[derive(Debug, Display, Error)]
pub enum CommandError {
    #[display("no command provided")]
    Empty,
    #[display("no asset symbol in command")]
    MissingSymbol,
}

#[derive(Debug, Display, Error)]
pub enum ServerError {
    #[display("failed to bind {addr}")]
    Bind { addr: String },
    #[display("http server failed")]
    Serve,
}
