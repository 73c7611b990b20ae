//! Rewriting prompts with the help of a provider.
//!
//! The improver wraps the user's prompt into an instruction, sends it to a
//! single provider and cleans up the answer. It never fails: when anything
//! goes wrong the original prompt is handed back together with the error.

use std::fmt::{self, Display};

use chatlist_model::ProviderConfig;
use serde::{Deserialize, Serialize};

use crate::Comparison;

/// Most rewordings kept from a multi-variant answer.
pub const MAX_VARIANTS: usize = 3;

const BASE_INSTRUCTION: &str = "You are an expert at improving prompts for \
    language models. Your task is to make the given prompt clearer, better \
    structured and more effective.";

/// How a prompt should be rewritten.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Clearer and better structured.
    #[default]
    Improved,
    /// Same meaning, different wording.
    Reformulated,
    /// Adapted to programming tasks.
    Code,
    /// Adapted to analytical tasks.
    Analysis,
    /// Adapted to creative tasks.
    Creative,
}

impl Variant {
    /// Every variant.
    pub const ALL: [Variant; 5] = [
        Variant::Improved,
        Variant::Reformulated,
        Variant::Code,
        Variant::Analysis,
        Variant::Creative,
    ];

    /// Parses a variant name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns the variant name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Improved => "improved",
            Variant::Reformulated => "reformulated",
            Variant::Code => "code",
            Variant::Analysis => "analysis",
            Variant::Creative => "creative",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Variant::Improved => {
                "Improve the prompt, making it clearer, better structured \
                 and more effective."
            }
            Variant::Reformulated => {
                "Reword the prompt, keeping its meaning but changing the \
                 wording."
            }
            Variant::Code => {
                "Adapt the prompt to programming and code-related tasks. \
                 Make it more technical and precise."
            }
            Variant::Analysis => {
                "Adapt the prompt to analytical tasks. Structure it so that \
                 it asks for a detailed analysis."
            }
            Variant::Creative => {
                "Adapt the prompt to creative tasks. Make it more inspiring \
                 and open to creative interpretation."
            }
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the instruction asking for one rewritten prompt.
pub fn improvement_prompt(prompt: &str, variant: Variant) -> String {
    format!(
        "{BASE_INSTRUCTION}\n\n{} Return only the rewritten version without \
         any comments.\n\nOriginal prompt:\n{prompt}\n\nReturn only the \
         rewritten prompt, without explanations or comments.",
        variant.instruction()
    )
}

/// Builds the instruction asking for several rewritten prompts as JSON.
pub fn variants_prompt(prompt: &str) -> String {
    format!(
        r#"You are an expert at improving prompts for language models.

Original prompt:
{prompt}

Your task:
1. Write an improved version of the prompt (clearer and better structured).
2. Suggest 2-3 rewordings that keep its meaning.
3. Where it makes sense, suggest adaptations for different kinds of tasks (code, analysis, creative).

Answer in JSON:
{{
    "improved": "improved version of the prompt",
    "variants": [
        "rewording 1",
        "rewording 2",
        "rewording 3"
    ],
    "code_version": "version for programming tasks (if applicable)",
    "analysis_version": "version for analytical tasks (if applicable)",
    "creative_version": "version for creative tasks (if applicable)"
}}

Return only the JSON, without any comments."#
    )
}

/// Cleans up a single rewritten prompt: trims it and removes one pair of
/// surrounding double quotes, then one pair of single quotes.
pub fn clean_reply(reply: &str) -> String {
    let mut text = reply.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote)
        {
            text = &text[1..text.len() - 1];
        }
    }
    text.to_owned()
}

/// Several rewritten versions of one prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Suggestions {
    /// The improved prompt.
    pub improved: String,
    /// Up to [`MAX_VARIANTS`] rewordings.
    pub variants: Vec<String>,
    /// Version for programming tasks.
    pub code_version: Option<String>,
    /// Version for analytical tasks.
    pub analysis_version: Option<String>,
    /// Version for creative tasks.
    pub creative_version: Option<String>,
}

#[derive(Deserialize)]
struct RawSuggestions {
    #[serde(default)]
    improved: Option<String>,
    #[serde(default)]
    variants: Vec<String>,
    #[serde(default)]
    code_version: Option<String>,
    #[serde(default)]
    analysis_version: Option<String>,
    #[serde(default)]
    creative_version: Option<String>,
}

impl Suggestions {
    /// Only the original prompt, nothing suggested.
    fn unchanged(original: &str) -> Self {
        Self {
            improved: original.to_owned(),
            ..Default::default()
        }
    }

    /// Extracts suggestions from a provider's answer.
    ///
    /// The JSON object may be wrapped in other text such as a markdown
    /// fence. If no object can be decoded, the first non-empty line is taken
    /// as the improved prompt and the next lines as rewordings.
    pub fn parse(reply: &str, original: &str) -> Self {
        let reply = reply.trim();
        if let Some(parsed) = Self::parse_json(reply, original) {
            return parsed;
        }

        trace!("answer has no JSON object, falling back to lines");
        let mut lines = reply.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(improved) = lines.next() else {
            return Self::unchanged(original);
        };
        Self {
            improved: improved.to_owned(),
            variants: lines.take(MAX_VARIANTS).map(str::to_owned).collect(),
            ..Default::default()
        }
    }

    fn parse_json(reply: &str, original: &str) -> Option<Self> {
        let start = reply.find('{')?;
        let end = reply.rfind('}')?;
        if end <= start {
            return None;
        }
        let raw: RawSuggestions =
            serde_json::from_str(&reply[start..=end]).ok()?;
        let mut variants = raw.variants;
        variants.truncate(MAX_VARIANTS);
        Some(Self {
            improved: raw.improved.unwrap_or_else(|| original.to_owned()),
            variants,
            code_version: raw.code_version,
            analysis_version: raw.analysis_version,
            creative_version: raw.creative_version,
        })
    }
}

/// The result of an improvement request.
///
/// On failure `value` holds the original prompt and `error` describes what
/// went wrong.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Improvement<T> {
    /// The rewritten prompt or suggestions.
    pub value: T,
    /// Why the original prompt was kept.
    pub error: Option<String>,
}

impl<T> Improvement<T> {
    /// Returns `true` if the provider's answer was used.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Asks `provider` for one rewritten version of `prompt`.
pub async fn improve(
    comparison: &Comparison,
    provider: &ProviderConfig,
    prompt: &str,
    variant: Variant,
) -> Improvement<String> {
    match ask(comparison, provider, &improvement_prompt(prompt, variant)).await
    {
        Ok(reply) => Improvement {
            value: clean_reply(&reply),
            error: None,
        },
        Err(error) => Improvement {
            value: prompt.to_owned(),
            error: Some(error),
        },
    }
}

/// Asks `provider` for several rewritten versions of `prompt`.
pub async fn suggest(
    comparison: &Comparison,
    provider: &ProviderConfig,
    prompt: &str,
) -> Improvement<Suggestions> {
    match ask(comparison, provider, &variants_prompt(prompt)).await {
        Ok(reply) => Improvement {
            value: Suggestions::parse(&reply, prompt),
            error: None,
        },
        Err(error) => Improvement {
            value: Suggestions::unchanged(prompt),
            error: Some(error),
        },
    }
}

async fn ask(
    comparison: &Comparison,
    provider: &ProviderConfig,
    meta_prompt: &str,
) -> Result<String, String> {
    // A disabled provider can still be picked explicitly.
    let provider = provider.clone().with_enabled(true);
    debug!("asking {} to improve a prompt", provider.name);
    let batch = comparison
        .compare(meta_prompt, std::slice::from_ref(&provider))
        .await
        .map_err(|err| err.to_string())?;
    let Some(outcome) = batch.outcomes().next() else {
        return Err("no answer received".to_owned());
    };
    if outcome.is_success() {
        Ok(outcome.text().to_owned())
    } else {
        Err(outcome.display_text().to_owned())
    }
}
