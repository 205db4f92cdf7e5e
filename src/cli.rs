use crate::config::SubmitConfig;
use crate::submission::EncodingChoice;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "batchpost",
    version,
    about = "Submit a document and its attachments as size-bounded multipart POSTs",
    long_about = None
)]
pub struct Cli {
    /// Submission URL (overrides `target` in the config file)
    #[arg(env = "BATCHPOST_TARGET")]
    pub target: Option<String>,

    /// Primary document, sent with every batch
    #[arg(short, long, value_name = "FILE")]
    pub document: PathBuf,

    /// Attachment, in send order (repeatable)
    #[arg(short, long = "attachment", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,

    /// Extra request header (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Maximum bytes per batch, document included
    #[arg(long, value_name = "BYTES")]
    pub ceiling: Option<u64>,

    /// Multipart encoding strategy
    #[arg(long, value_enum)]
    pub encoding: Option<EncodingChoice>,

    /// Skip attachments the server already confirmed
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    pub resume_from: usize,

    /// Whole-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file (default: <config dir>/batchpost/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the outcome as JSON instead of a progress bar
    #[arg(long)]
    pub json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl Cli {
    /// Flags win over file settings.
    pub fn apply(&self, config: &mut SubmitConfig) {
        if let Some(target) = &self.target {
            config.target = Some(target.clone());
        }
        if let Some(ceiling) = self.ceiling {
            config.ceiling = ceiling;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
        config.extra_headers.extend(self.headers.iter().cloned());
    }

    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from([
            "batchpost",
            "http://localhost/submission",
            "-d",
            "form.xml",
            "-a",
            "a.jpg",
            "--attachment",
            "b.jpg",
        ])
        .unwrap();
        assert_eq!(cli.target.as_deref(), Some("http://localhost/submission"));
        assert_eq!(cli.attachments, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
        assert_eq!(cli.resume_from, 0);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_headers_and_overrides() {
        let cli = Cli::try_parse_from([
            "batchpost",
            "http://localhost/submission",
            "-d",
            "form.xml",
            "-H",
            "Cookie: JSESSIONID=1",
            "--ceiling",
            "500",
            "--encoding",
            "manual",
            "-vv",
        ])
        .unwrap();

        let mut config = SubmitConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.ceiling, 500);
        assert_eq!(config.encoding, EncodingChoice::Manual);
        assert_eq!(
            config.extra_headers,
            vec![("Cookie".to_string(), "JSESSIONID=1".to_string())]
        );
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn test_bad_header_rejected() {
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
        assert_eq!(
            parse_header("X-Token:a:b").unwrap(),
            ("X-Token".to_string(), "a:b".to_string())
        );
    }

    #[test]
    fn test_document_required() {
        assert!(Cli::try_parse_from(["batchpost", "http://localhost/"]).is_err());
    }
}
