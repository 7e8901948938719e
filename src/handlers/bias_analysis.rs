use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::response::query_json;
use crate::article::Article;
use crate::llm::LLMClient;
use crate::pipeline::{
    BiasReport, ScoringError, Step, StepError, StepHandler, StepInput, StepKind, StepPayload,
    StepType,
};

const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
struct BiasAnswer {
    bias_score: f64,
    #[serde(default = "neutral_direction")]
    bias_direction: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence: Option<f64>,
}

fn neutral_direction() -> String {
    "neutral".to_string()
}

pub struct BiasAnalysisHandler {
    client: Arc<dyn LLMClient>,
}

impl BiasAnalysisHandler {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

fn build_prompt(article: &Article, aspects: &[String]) -> String {
    let mut prompt = String::from(
        "Analyze the following text for political or ideological bias. Consider word choice, \
         framing, source selection, and presentation of facts.\n\n",
    );
    if !aspects.is_empty() {
        prompt.push_str(&format!("Focus on these aspects: {}\n\n", aspects.join(", ")));
    }
    prompt.push_str(&format!("Text to analyze:\n{}\n\n", article.text()));
    prompt.push_str(
        r#"Score bias from 0.0 to 1.0 where 0.5 is neutral, lower values lean left and higher values lean right.

Return your analysis in the following JSON format:
{
    "bias_score": 0.0-1.0,
    "bias_direction": "left|right|neutral|other",
    "reasoning": "explanation of the bias assessment",
    "confidence": 0.0-1.0
}"#,
    );
    prompt
}

#[async_trait]
impl StepHandler for BiasAnalysisHandler {
    fn name(&self) -> &str {
        "llm-bias-analysis"
    }

    async fn run(&self, step: &Step, input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        let aspects = match &step.kind {
            StepKind::BiasAnalysis(params) => &params.aspects,
            other => {
                return Err(StepError::WrongStepKind {
                    handler: StepType::BiasAnalysis,
                    step: other.step_type(),
                })
            }
        };

        let prompt = build_prompt(input.article, aspects);
        let answer: BiasAnswer =
            query_json(self.client.as_ref(), prompt, MAX_TOKENS, "bias_analysis").await?;

        ScoringError::check_unit("bias_score", answer.bias_score)
            .map_err(|e| StepError::InvalidPayload(e.to_string()))?;

        Ok(StepPayload::BiasAnalysis(BiasReport {
            bias_score: answer.bias_score,
            bias_direction: answer.bias_direction.to_lowercase(),
            confidence: answer.confidence,
            reasoning: answer.reasoning,
        }))
    }
}
