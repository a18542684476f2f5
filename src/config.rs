use anyhow::Context;
use api::lobby::Limits;
use quiz::QuizOptions;
use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

const DEFAULT_PORT: u16 = 8501;
const DEFAULT_QUESTIONS: &str = "questions.json";

/// Runtime settings, read from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: SocketAddr,
    pub questions: PathBuf,
    pub options: QuizOptions,
    pub limits: Limits,
}

fn parse_flag(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{name} must be a boolean but was {other:?}"),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = match lookup("HOST") {
            Some(host) => host.parse().with_context(|| format!("HOST is not an IP address: {host:?}"))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let port = match lookup("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT is not a valid port: {port:?}"))?,
            None => DEFAULT_PORT,
        };
        let questions = lookup("QUESTIONS_PATH").map_or_else(|| PathBuf::from(DEFAULT_QUESTIONS), PathBuf::from);
        let shuffle = match lookup("QUIZ_SHUFFLE") {
            Some(flag) => parse_flag("QUIZ_SHUFFLE", &flag)?,
            None => false,
        };
        let feedback = match lookup("QUIZ_FEEDBACK") {
            Some(flag) => parse_flag("QUIZ_FEEDBACK", &flag)?,
            None => true,
        };
        let limit = match lookup("QUIZ_LIMIT") {
            Some(limit) => {
                let limit: usize = limit.trim().parse().with_context(|| format!("QUIZ_LIMIT is not a count: {limit:?}"))?;
                NonZeroUsize::new(limit)
            }
            None => None,
        };


        let mut limits = Limits::default();
        if let Some(ttl) = lookup("QUIZ_SESSION_TTL") {
            let secs: NonZeroU64 = ttl
                .trim()
                .parse()
                .with_context(|| format!("QUIZ_SESSION_TTL is not a positive number of seconds: {ttl:?}"))?;
            limits.idle = Duration::from_secs(secs.get());
        }
        if let Some(max) = lookup("QUIZ_MAX_SESSIONS") {
            let max: NonZeroUsize =
                max.trim().parse().with_context(|| format!("QUIZ_MAX_SESSIONS is not a positive count: {max:?}"))?;
            limits.capacity = max.get();
        }

        Ok(Self {
            addr: SocketAddr::new(host, port),
            questions,
            options: QuizOptions { shuffle, limit, feedback },
            limits,
        })
    }
}
