//! Interactive startup prompts on stdin.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::warn;

use crate::config::split_csv;
use crate::error::ConfigError;
use crate::surface::MonitorTarget;

/// What the operator chose at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Mandatory keywords for every response.
    pub keywords: Vec<String>,
    pub target: MonitorTarget,
}

/// Reads answers line by line from any buffered reader.
pub struct Prompter<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>, ConfigError> {
        eprint!("{question}");
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    /// Comma-separated keywords. An empty answer means none.
    pub async fn keywords(&mut self) -> Result<Vec<String>, ConfigError> {
        let answer = self
            .ask("Keywords every response must include, comma-separated (Enter for none): ")
            .await?
            .unwrap_or_default();
        let keywords = split_csv(&answer);
        if keywords.is_empty() {
            eprintln!("Proceeding without mandatory keywords.");
        } else {
            eprintln!("Mandatory keywords: {}", keywords.join(", "));
        }
        Ok(keywords)
    }

    /// Monitoring mode 1-3. Re-asks until the answer is valid.
    pub async fn mode(&mut self) -> Result<u8, ConfigError> {
        eprintln!("1. Home feed");
        eprintln!("2. Community");
        eprintln!("3. Keyword search");
        loop {
            let Some(answer) = self.ask("Choose an option [1-3]: ").await? else {
                return Err(ConfigError::MissingRequired {
                    key: "mode".to_string(),
                    hint: "stdin closed before a monitoring mode was chosen".to_string(),
                });
            };
            match answer.as_str() {
                "1" => return Ok(1),
                "2" => return Ok(2),
                "3" => return Ok(3),
                _ => eprintln!("Enter a number between 1 and 3."),
            }
        }
    }

    /// Non-empty search keyword. Re-asks on blank answers.
    pub async fn search_keyword(&mut self) -> Result<String, ConfigError> {
        loop {
            match self.ask("Search keyword: ").await? {
                Some(keyword) if !keyword.is_empty() => return Ok(keyword),
                Some(_) => eprintln!("Please enter a keyword."),
                None => {
                    return Err(ConfigError::MissingRequired {
                        key: "search keyword".to_string(),
                        hint: "stdin closed before a search keyword was entered".to_string(),
                    });
                }
            }
        }
    }

    /// Run every startup prompt.
    pub async fn run_plan(&mut self, community_url: Option<&str>) -> Result<RunPlan, ConfigError> {
        let keywords = self.keywords().await?;
        let target = match self.mode().await? {
            2 => match community_url {
                Some(url) => MonitorTarget::Community {
                    url: url.to_string(),
                },
                None => {
                    warn!("FEED_COMMUNITY_URL is not set; monitoring the home feed instead");
                    MonitorTarget::Home
                }
            },
            3 => MonitorTarget::Keyword {
                keyword: self.search_keyword().await?,
            },
            _ => MonitorTarget::Home,
        };
        Ok(RunPlan { keywords, target })
    }
}
