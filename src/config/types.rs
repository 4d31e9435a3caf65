// -------------------------------------------------------------------------------------------------
// ---- LogLevel -----------------------------------------------------------------------------------

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// EnvFilter directive. The transport crates are capped at `warn` unless
    /// tracing is requested, their per-frame chatter drowns out relay logs.
    pub fn filter_directive(self) -> String {
        match self {
            LogLevel::Trace => "trace".to_string(),
            level => format!(
                "{},hyper=warn,hyper_util=warn,tungstenite=warn,tokio_tungstenite=warn",
                level.as_str()
            ),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// ---- Tests --------------------------------------------------------------------------------------


// -------------------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------
