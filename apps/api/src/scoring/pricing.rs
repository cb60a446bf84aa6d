use tracing::warn;

use crate::models::llm::LlmProvider;

/// USD per million tokens (input, output) for hosted-tier models.
const HOSTED_PRICES: &[(&str, f64, f64)] = &[
    ("claude-opus-4-1", 15.0, 75.0),
    ("claude-sonnet-4-5", 3.0, 15.0),
    ("claude-haiku-4-5", 1.0, 5.0),
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.0),
];

/// Cost of one evaluation call. Local inference is free; unknown hosted models
/// are priced at zero and logged so the table can be extended.
pub fn compute_cost_usd(
    provider: LlmProvider,
    model_id: &str,
    input_tokens: u32,
    output_tokens: u32,
) -> f64 {
    if provider.is_local() {
        return 0.0;
    }

    // Dated snapshots ("claude-sonnet-4-5-20250929") price like their base id.
    // Longest prefix wins so "gpt-4o-mini" is not priced as "gpt-4o".
    let price = HOSTED_PRICES
        .iter()
        .filter(|(id, _, _)| model_id.starts_with(id))
        .max_by_key(|(id, _, _)| id.len());

    match price {
        Some((_, input_per_m, output_per_m)) => {
            (input_tokens as f64 * input_per_m + output_tokens as f64 * output_per_m) / 1_000_000.0
        }
        None => {
            warn!(
                "No price entry for {} model '{model_id}', recording cost as 0",
                provider.as_str()
            );
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_model_is_free() {
        assert_eq!(
            compute_cost_usd(LlmProvider::Ollama, "qwen2.5:7b", 5_000, 800),
            0.0
        );
    }

    #[test]
    fn test_sonnet_pricing() {
        // 10k in * $3/M + 2k out * $15/M = 0.03 + 0.03
        let cost = compute_cost_usd(LlmProvider::Anthropic, "claude-sonnet-4-5", 10_000, 2_000);
        assert!((cost - 0.06).abs() < 1e-9, "Cost was {cost}");
    }

    #[test]
    fn test_dated_snapshot_uses_base_price() {
        let base = compute_cost_usd(LlmProvider::Anthropic, "claude-haiku-4-5", 1_000, 1_000);
        let dated = compute_cost_usd(
            LlmProvider::Anthropic,
            "claude-haiku-4-5-20251001",
            1_000,
            1_000,
        );
        assert_eq!(base, dated);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mini = compute_cost_usd(LlmProvider::OpenAi, "gpt-4o-mini", 1_000_000, 0);
        assert!((mini - 0.15).abs() < 1e-9, "Cost was {mini}");
    }

    #[test]
    fn test_unknown_model_costs_zero() {
        assert_eq!(compute_cost_usd(LlmProvider::OpenAi, "o9", 1_000, 1_000), 0.0);
    }
}
