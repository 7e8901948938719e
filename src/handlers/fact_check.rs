use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::response::query_json;
use crate::article::Article;
use crate::llm::LLMClient;
use crate::news::{RelatedArticle, SourceDirectory};
use crate::pipeline::{
    ClaimVerdict, FactCheckReport, Step, StepError, StepHandler, StepInput, StepKind, StepPayload,
    StepType,
};

const MAX_TOKENS: u32 = 4096;
const MAX_RELATED_ARTICLES: usize = 3;

#[derive(Debug, Deserialize)]
struct FactCheckAnswer {
    #[serde(default)]
    claims: Vec<ClaimVerdict>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Extracts factual claims and asks the model for a verdict on each
pub struct FactCheckHandler {
    client: Arc<dyn LLMClient>,
    directory: Option<Arc<dyn SourceDirectory>>,
}

impl FactCheckHandler {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            directory: None,
        }
    }

    /// Adds coverage of the same story by other outlets to the prompt
    pub fn with_directory(mut self, directory: Arc<dyn SourceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    async fn related_coverage(&self, article: &Article) -> Vec<RelatedArticle> {
        let Some(directory) = &self.directory else {
            return Vec::new();
        };
        match directory
            .find_related_articles(&article.title, MAX_RELATED_ARTICLES)
            .await
        {
            Ok(related) => related,
            Err(e) => {
                warn!(directory = directory.name(), "Related coverage lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn build_prompt(
    article: &Article,
    max_claims: usize,
    context: Option<String>,
    related: &[RelatedArticle],
) -> String {
    let mut prompt = format!(
        "You are an expert fact-checker. Identify at most {max_claims} factual claims in the \
         article below and determine the veracity of each based on known facts.\n\n\
         Article Title: {}\n\nArticle Content:\n{}\n\n",
        article.title, article.content
    );
    if let Some(context) = context {
        prompt.push_str(&format!("Additional Context: {}\n\n", context));
    }
    if !related.is_empty() {
        prompt.push_str("Related Coverage:\n");
        for article in related {
            prompt.push_str(&format!("- \"{}\" ({})\n", article.title, article.source));
        }
        prompt.push('\n');
    }
    prompt.push_str(
        r#"Return your analysis in the following JSON format:
{
    "claims": [
        {
            "claim": "the exact claim text",
            "verdict": "true|false|misleading|unverifiable",
            "confidence": 0.0-1.0,
            "explanation": "why this verdict",
            "sources": ["sources that support or refute the claim"]
        }
    ],
    "summary": "overall summary of the fact-checking results",
    "confidence": 0.0-1.0
}"#,
    );
    prompt
}

/// What source verification found, when it ran before us
fn source_context(input: &StepInput<'_>) -> Option<String> {
    input.upstream_payloads().find_map(|payload| match payload {
        StepPayload::SourceVerification(report) => {
            let mut parts = Vec::new();
            if let Some(score) = report.source_credibility_score {
                parts.push(format!("source credibility score {:.2}", score));
            }
            if !report.potential_issues.is_empty() {
                parts.push(format!(
                    "known source issues: {}",
                    report.potential_issues.join("; ")
                ));
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    })
}

#[async_trait]
impl StepHandler for FactCheckHandler {
    fn name(&self) -> &str {
        "llm-fact-check"
    }

    async fn run(&self, step: &Step, input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        let params = match &step.kind {
            StepKind::FactCheck(params) => params,
            other => {
                return Err(StepError::WrongStepKind {
                    handler: StepType::FactCheck,
                    step: other.step_type(),
                })
            }
        };

        debug!(
            step_id = %step.id,
            requested_model = %params.model,
            max_claims = params.max_claims,
            backend = self.client.name(),
            "Fact-checking article"
        );

        let related = self.related_coverage(input.article).await;
        let prompt = build_prompt(
            input.article,
            params.max_claims,
            source_context(input),
            &related,
        );
        let answer: FactCheckAnswer =
            query_json(self.client.as_ref(), prompt, MAX_TOKENS, "fact_check").await?;

        let mut claims = answer.claims;
        claims.truncate(params.max_claims);

        let supported = claims.iter().filter(|c| c.verdict.supports()).count() as u32;
        let contradicted = claims.iter().filter(|c| c.verdict.contradicts()).count() as u32;

        Ok(StepPayload::FactCheck(FactCheckReport {
            claims_supported: supported,
            claims_contradicted: contradicted,
            confidence: answer.confidence,
            claims,
            summary: (!answer.summary.is_empty()).then_some(answer.summary),
        }))
    }
}
