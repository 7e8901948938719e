use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::response::query_json;
use crate::article::Article;
use crate::llm::LLMClient;
use crate::news::{normalize_domain, SourceDirectory, SourceRecord};
use crate::pipeline::{
    ScoringError, SourceReport, Step, StepError, StepHandler, StepInput, StepKind, StepPayload,
    StepType, VerificationDepth,
};

const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
struct SourceAnswer {
    source_credibility_score: f64,
    #[serde(default)]
    reliability_indicators: Vec<String>,
    #[serde(default)]
    potential_issues: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Rates the credibility of the publishing outlet and of the sources the article cites.
///
/// With a [`SourceDirectory`] attached, the article's domain is looked up first
/// and the finding is given to the model and added to the report's indicators.
pub struct SourceVerificationHandler {
    client: Arc<dyn LLMClient>,
    directory: Option<Arc<dyn SourceDirectory>>,
}

impl SourceVerificationHandler {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn SourceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// `None` when there is no directory, no usable URL, or the lookup failed
    async fn directory_lookup(&self, article: &Article) -> Option<DirectoryFinding> {
        let directory = self.directory.as_ref()?;
        let domain = article.url.as_deref().and_then(normalize_domain)?;
        match directory.verify_source(&domain).await {
            Ok(record) => {
                debug!(domain = %domain, directory = directory.name(), found = record.is_some(), "Source directory lookup");
                Some(DirectoryFinding {
                    directory: directory.name().to_string(),
                    domain,
                    record,
                })
            }
            Err(e) => {
                warn!(domain = %domain, directory = directory.name(), "Source directory lookup failed: {}", e);
                None
            }
        }
    }
}

struct DirectoryFinding {
    directory: String,
    domain: String,
    record: Option<SourceRecord>,
}

impl DirectoryFinding {
    fn listed(&self) -> bool {
        self.record.as_ref().is_some_and(|r| r.is_verified)
    }

    fn describe(&self) -> String {
        match &self.record {
            Some(r) if r.is_verified => format!(
                "{} is listed in the {} source directory as {}",
                self.domain, self.directory, r.name
            ),
            Some(r) => format!(
                "{} is not a listed source in the {} directory ({} indexed articles)",
                self.domain,
                self.directory,
                r.article_count.unwrap_or(0)
            ),
            None => format!("{} is unknown to the {} directory", self.domain, self.directory),
        }
    }
}

fn build_prompt(
    article: &Article,
    depth: VerificationDepth,
    finding: Option<&DirectoryFinding>,
) -> String {
    let mut prompt = String::from(
        "Analyze the credibility of the following source or article. Consider:\n\
         - Reputation of the publication\n\
         - Editorial standards\n\
         - History of accuracy\n\
         - Transparency about sources and methods\n\
         - Any known biases or conflicts of interest\n\n",
    );
    if depth == VerificationDepth::Thorough {
        prompt.push_str(
            "Be thorough: examine every source the article cites, not only the outlet, \
             and list each concern you find.\n\n",
        );
    }
    if let Some(url) = &article.url {
        prompt.push_str(&format!("Article URL: {}\n\n", url));
    }
    if let Some(source) = &article.source {
        prompt.push_str(&format!("Source/Publication: {}\n\n", source));
    }
    if let Some(author) = &article.author {
        prompt.push_str(&format!("Author: {}\n\n", author));
    }
    if let Some(finding) = finding {
        prompt.push_str(&format!("Source Directory: {}\n\n", finding.describe()));
    }
    prompt.push_str(&format!(
        "Article Content (for context):\n{}\n\n",
        article.content
    ));
    prompt.push_str(
        r#"Return your analysis in the following JSON format:
{
    "source_credibility_score": 0.0-1.0,
    "reliability_indicators": ["positive indicators of reliability"],
    "potential_issues": ["potential issues or concerns"],
    "confidence": 0.0-1.0
}"#,
    );
    prompt
}

#[async_trait]
impl StepHandler for SourceVerificationHandler {
    fn name(&self) -> &str {
        "llm-source-verification"
    }

    async fn run(&self, step: &Step, input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        let depth = match &step.kind {
            StepKind::SourceVerification(params) => params.depth,
            other => {
                return Err(StepError::WrongStepKind {
                    handler: StepType::SourceVerification,
                    step: other.step_type(),
                })
            }
        };

        let finding = self.directory_lookup(input.article).await;
        let prompt = build_prompt(input.article, depth, finding.as_ref());
        let answer: SourceAnswer = query_json(
            self.client.as_ref(),
            prompt,
            MAX_TOKENS,
            "source_verification",
        )
        .await?;

        ScoringError::check_unit("source_credibility_score", answer.source_credibility_score)
            .map_err(|e| StepError::InvalidPayload(e.to_string()))?;

        let mut reliability_indicators = answer.reliability_indicators;
        let mut potential_issues = answer.potential_issues;
        if let Some(finding) = &finding {
            if finding.listed() {
                reliability_indicators.push(finding.describe());
            } else {
                potential_issues.push(finding.describe());
            }
        }

        Ok(StepPayload::SourceVerification(SourceReport {
            reliable_sources: reliability_indicators.len() as u32,
            questionable_sources: potential_issues.len() as u32,
            source_credibility_score: Some(answer.source_credibility_score),
            confidence: answer.confidence,
            listed_source: finding.as_ref().map(DirectoryFinding::listed),
            reliability_indicators,
            potential_issues,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_depth() {
        let article = Article::new("t", "c")
            .with_source("Daily Planet")
            .with_url("https://example.com/a");

        let standard = build_prompt(&article, VerificationDepth::Standard, None);
        let thorough = build_prompt(&article, VerificationDepth::Thorough, None);

        assert!(standard.contains("Source/Publication: Daily Planet"));
        assert!(standard.contains("Article URL: https://example.com/a"));
        assert!(!standard.contains("Be thorough"));
        assert!(thorough.contains("Be thorough"));
        assert!(!standard.contains("Source Directory"));
    }

    #[test]
    fn test_directory_finding_descriptions() {
        let unknown = DirectoryFinding {
            directory: "newsapi".to_string(),
            domain: "example.net".to_string(),
            record: None,
        };
        assert!(!unknown.listed());
        assert_eq!(unknown.describe(), "example.net is unknown to the newsapi directory");

        let article = Article::new("t", "c");
        let prompt = build_prompt(&article, VerificationDepth::Standard, Some(&unknown));
        assert!(prompt.contains("Source Directory: example.net is unknown to the newsapi directory"));
    }
}
