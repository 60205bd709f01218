use sentinel_core::types::RetrievalMatch;

/// Context blocks packed for one completion prompt.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// Included matches, in retrieval order.
    pub blocks: Vec<RetrievalMatch>,
    pub total_chars: usize,
    /// Mean relevance score over the included blocks.
    pub average_score: f32,
}

#[derive(Debug, Clone)]
pub enum Assembly {
    Context(AssembledContext),
    /// Nothing cleared the score threshold. Carries the best score seen
    /// across all matches so operators can judge how close it came.
    NoContext { highest_score: Option<f32> },
}

/// Filter matches by minimum score, then pack the survivors into a
/// character budget.
///
/// Packing preserves retrieval order and never truncates: a block is
/// included only if it fits entirely in the remaining budget. Blocks
/// that don't fit are skipped rather than ending the scan, since a later
/// shorter block may still fit.
pub fn assemble(matches: &[RetrievalMatch], min_score: f32, max_chars: usize) -> Assembly {
    let surviving: Vec<&RetrievalMatch> =
        matches.iter().filter(|m| m.score >= min_score).collect();

    if surviving.is_empty() {
        let highest_score = matches
            .iter()
            .map(|m| m.score)
            .fold(None, |best: Option<f32>, s| match best {
                Some(b) if b >= s => Some(b),
                _ => Some(s),
            });
        return Assembly::NoContext { highest_score };
    }

    let mut blocks = Vec::new();
    let mut total_chars = 0usize;
    let mut total_score = 0f32;

    for m in surviving {
        if total_chars + m.text.len() <= max_chars {
            total_chars += m.text.len();
            total_score += m.score;
            blocks.push(m.clone());
        }
    }

    let average_score = if blocks.is_empty() {
        0.0
    } else {
        total_score / blocks.len() as f32
    };

    Assembly::Context(AssembledContext {
        blocks,
        total_chars,
        average_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(score: f32, len: usize) -> RetrievalMatch {
        RetrievalMatch {
            score,
            text: "x".repeat(len),
            url: "https://docs/page".to_string(),
        }
    }

    #[test]
    fn test_all_below_threshold_reports_highest_score() {
        let matches = vec![m(0.41, 100), m(0.62, 100), m(0.3, 100)];
        match assemble(&matches, 0.75, 16_000) {
            Assembly::NoContext { highest_score } => {
                assert_eq!(highest_score, Some(0.62));
            }
            Assembly::Context(_) => panic!("expected NoContext"),
        }
    }

    #[test]
    fn test_no_matches_at_all() {
        match assemble(&[], 0.75, 16_000) {
            Assembly::NoContext { highest_score } => assert_eq!(highest_score, None),
            Assembly::Context(_) => panic!("expected NoContext"),
        }
    }

    #[test]
    fn test_packing_skips_over_budget_blocks_without_breaking() {
        // 1000 fits, second 1000 would exceed 1500, the later 400 still fits.
        let matches = vec![m(0.9, 1000), m(0.85, 1000), m(0.8, 400)];
        match assemble(&matches, 0.75, 1500) {
            Assembly::Context(ctx) => {
                assert_eq!(ctx.blocks.len(), 2);
                assert_eq!(ctx.total_chars, 1400);
                assert_eq!(ctx.blocks[0].text.len(), 1000);
                assert_eq!(ctx.blocks[1].text.len(), 400);
            }
            Assembly::NoContext { .. } => panic!("expected Context"),
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let matches = vec![m(0.8, 10), m(0.95, 10), m(0.85, 10)];
        match assemble(&matches, 0.75, 1000) {
            Assembly::Context(ctx) => {
                let scores: Vec<f32> = ctx.blocks.iter().map(|b| b.score).collect();
                // Retrieval order, not score order
                assert_eq!(scores, vec![0.8, 0.95, 0.85]);
            }
            Assembly::NoContext { .. } => panic!("expected Context"),
        }
    }

    #[test]
    fn test_average_score_over_included_blocks_only() {
        let matches = vec![m(0.9, 1000), m(0.7, 10), m(0.8, 1000)];
        match assemble(&matches, 0.75, 1500) {
            Assembly::Context(ctx) => {
                // 0.7 fails the threshold and the trailing 1000-char block
                // busts the budget, leaving only the first block.
                assert_eq!(ctx.blocks.len(), 1);
                assert!((ctx.average_score - 0.9).abs() < 1e-6);
            }
            Assembly::NoContext { .. } => panic!("expected Context"),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let matches = vec![m(0.75, 10)];
        assert!(matches!(
            assemble(&matches, 0.75, 1000),
            Assembly::Context(_)
        ));
    }
}
