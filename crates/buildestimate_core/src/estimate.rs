//! crates/buildestimate_core/src/estimate.rs
//!
//! The cost-estimation workflow: booking-token arithmetic, the deterministic
//! fallback table, prompt construction and the `EstimateEngine`, which wraps the
//! generative collaborators so that callers always get a value back.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{ConstructionDetails, CostTier, LayoutOption};
use crate::ports::{CostEstimationService, LayoutGenerationService, PortError, PortResult};

/// Booking-token percentages an engineer may ask for.
pub const TOKEN_PERCENTAGES: [u8; 3] = [5, 10, 15];

pub const TIER_COUNT: usize = 6;

/// (label, material multiplier, labor multiplier) for the fallback table.
pub const FALLBACK_MULTIPLIERS: [(&str, f64, f64); TIER_COUNT] = [
    ("Economy", 0.8, 0.85),
    ("Standard", 1.0, 1.0),
    ("Premium", 1.4, 1.2),
    ("Luxury", 1.8, 1.4),
    ("Ultra-Luxury", 2.5, 1.8),
    ("Eco-Friendly", 1.6, 1.5),
];

pub const DEFAULT_LAYOUT_STYLES: [&str; 3] = [
    "Modern Minimalist",
    "Traditional Indian",
    "Contemporary Open-Plan",
];

pub const MAX_LAYOUT_STYLES: usize = 3;

const LAYOUT_ASPECT_RATIO: &str = "4:3";

/// Opening line of a FieldBot conversation.
pub const FIELD_BOT_GREETING: &str = "Operational! I am FieldBot, your AI Site Supervisor. \
Provide a location (Village, City, Pincode) and I will calculate a professional construction estimate for you.";

/// Reply when the service answered with no text.
pub const FIELD_BOT_EMPTY_REPLY: &str = "Connection lag detected. Please restate the query.";

/// Reply when the service could not be reached in time.
pub const FIELD_BOT_OFFLINE_REPLY: &str = "Error: AI Logic Core offline. Check your network connection.";

pub const FIELD_BOT_INSTRUCTION: &str = "You are FieldBot, a world-class structural and civil engineering AI for the BuildEstimate Pro platform.
When a user provides a location (village/city/state/pincode), estimate house construction cost based on that area's economics.

RULES:
- Use Indian construction standards (2024-2025 realistic pricing).
- Adjust cost according to location category (Metro / Tier 2 / Rural).
- Labour rate must depend on local wages.
- Always respond in INR ₹.
- Never refuse; always estimate logically like a professional contractor.
- If exact data is unavailable, intelligently approximate using the nearest major city economy.

STRICT OUTPUT FORMAT (Always use this exact template):

Location Type: <Metro / Tier2 / Rural>

COST PER SQ FT
Material: ₹____
Labour: ₹____
Total: ₹____

MATERIAL COST BREAKDOWN (per sq ft)
Cement: ₹__
Steel: ₹__
Sand: ₹__
Aggregate: ₹__
Bricks/Blocks: ₹__
Flooring/Tiles: ₹__
Electrical: ₹__
Plumbing: ₹__
Paint/Putty: ₹__
Doors/Windows: ₹__
Miscellaneous: ₹__

HOUSE ESTIMATE
500 sq ft → ₹____
1000 sq ft → ₹____
1500 sq ft → ₹____

QUALITY RANGE
Basic: ₹____/sq ft
Standard: ₹____/sq ft
Premium: ₹____/sq ft

KEY FACTORS
- Wage level
- Transport cost
- Material availability

Summary in Hindi:
[Simple Hindi explanation in 3-4 lines here]";

/// `round(percentage / 100 × (material + labor))`, rounding halves up.
///
/// Computed in `i128` and saturated into `i64`; quoted costs are bounded by
/// `MAX_COST_INR` long before saturation matters.
pub fn token_amount(material_cost: i64, labor_cost: i64, percentage: u8) -> i64 {
    let total = i128::from(material_cost) + i128::from(labor_cost);
    let amount = (total * i128::from(percentage) + 50).div_euclid(100);
    i64::try_from(amount).unwrap_or(if amount < 0 { i64::MIN } else { i64::MAX })
}

/// The deterministic table used when the generative service is unavailable.
pub fn fallback_cost_tiers(details: &ConstructionDetails) -> Vec<CostTier> {
    let area = details.effective_area();
    let rooms = f64::from(details.total_rooms());
    let base_material = area * 1200.0 + rooms * 40_000.0;
    let base_labor = area * 800.0 + rooms * 25_000.0;

    FALLBACK_MULTIPLIERS
        .iter()
        .map(|(label, m, l)| CostTier {
            label: label.to_string(),
            material_cost: (base_material * m).round() as i64,
            labor_cost: (base_labor * l).round() as i64,
            explanation: format!(
                "Estimated costs for {} grade construction based on general market trends.",
                label
            ),
        })
        .collect()
}

/// Builds a tier from untrusted numbers, clamping negative or non-finite costs to zero.
pub fn tier_from_raw(label: &str, material: f64, labor: f64, explanation: &str) -> CostTier {
    let clamp = |v: f64| if v.is_finite() && v > 0.0 { v.round() as i64 } else { 0 };
    CostTier {
        label: label.trim().to_string(),
        material_cost: clamp(material),
        labor_cost: clamp(labor),
        explanation: explanation.trim().to_string(),
    }
}

/// Drops unlabeled tiers and keeps at most `TIER_COUNT`.
pub fn sanitize_tiers(tiers: Vec<CostTier>) -> Vec<CostTier> {
    tiers
        .into_iter()
        .filter(|t| !t.label.is_empty())
        .map(|t| CostTier {
            material_cost: t.material_cost.max(0),
            labor_cost: t.labor_cost.max(0),
            ..t
        })
        .take(TIER_COUNT)
        .collect()
}

fn describe_area(details: &ConstructionDetails) -> String {
    match (details.length, details.breadth) {
        (Some(l), Some(b)) => format!("{} sq ft ({} ft x {} ft)", details.effective_area(), l, b),
        _ => format!("{} sq ft", details.plot_area),
    }
}

fn floor_breakdown(details: &ConstructionDetails) -> String {
    details
        .floor_configs()
        .iter()
        .map(|f| {
            format!(
                "Floor {}: {} Rooms, {} Bathrooms, Kitchen: {}",
                f.floor_number,
                f.rooms,
                f.bathrooms,
                f.kitchen_type.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_cost_prompt(details: &ConstructionDetails) -> String {
    format!(
        "Provide 6 distinct construction cost estimate tiers for a house in India with the following specs:
- Plot Area: {area}
- Total Floors: {floors}
- Floor Breakdown:
{breakdown}
- Parking: {parking}
- Budget Range: {budget}
- Timeline: {timeline} months
- Location: {location}
- Additional Notes: {notes}

The 6 tiers should be:
1. Economy (Basic finishes, minimal costs)
2. Budget-Friendly (Decent materials, cost-conscious)
3. Standard (Market average quality)
4. Premium (High-quality finishes, branded fittings)
5. Luxury (Premium marble, designer woodwork)
6. Ultra-Luxury (Smart home, top-tier imported materials, architectural excellence)

Calculate realistic material and labor costs in Indian Rupees (INR) for each.
Explain briefly (1 sentence) what defines that tier.",
        area = describe_area(details),
        floors = details.floors(),
        breakdown = floor_breakdown(details),
        parking = if details.parking { "Required" } else { "Not Required" },
        budget = details.budget_range,
        timeline = details.timeline_months,
        location = details.location.as_deref().unwrap_or("Not specified"),
        notes = details.notes.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or("None"),
    )
}

pub fn build_layout_prompt(details: &ConstructionDetails, style: &str) -> String {
    format!(
        "A clean 2D architectural floor plan, top-down view, {style} style, for a house on a {area} plot.
{breakdown}
Parking: {parking}. Label every room. White background, black linework, no people, no perspective.",
        style = style,
        area = describe_area(details),
        breakdown = floor_breakdown(details),
        parking = if details.parking { "covered car parking" } else { "none" },
    )
}

//=========================================================================================
// EstimateEngine
//=========================================================================================

/// The result of a layout batch. An empty batch means "could not generate layouts".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutBatch {
    pub options: Vec<LayoutOption>,
    pub failed: usize,
}

impl LayoutBatch {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Fronts the generative collaborators. None of its operations return an error.
#[derive(Clone)]
pub struct EstimateEngine {
    estimator: Arc<dyn CostEstimationService>,
    layouts: Arc<dyn LayoutGenerationService>,
    timeout: Duration,
}

impl EstimateEngine {
    pub fn new(
        estimator: Arc<dyn CostEstimationService>,
        layouts: Arc<dyn LayoutGenerationService>,
        timeout: Duration,
    ) -> Self {
        Self {
            estimator,
            layouts,
            timeout,
        }
    }

    /// Six cost tiers from the generative service, or the fallback table when
    /// the call fails, times out, is cancelled or yields nothing usable.
    pub async fn request_cost_tiers(
        &self,
        details: &ConstructionDetails,
        cancel: &CancellationToken,
    ) -> Vec<CostTier> {
        let prompt = build_cost_prompt(details);
        let call = self.estimator.generate_cost_tiers(&prompt);
        match bounded(call, self.timeout, cancel).await {
            Ok(tiers) => {
                let tiers = sanitize_tiers(tiers);
                if tiers.is_empty() {
                    warn!("Estimate service returned no usable tiers, using fallback table");
                    fallback_cost_tiers(details)
                } else {
                    info!("Received {} AI cost tiers", tiers.len());
                    tiers
                }
            }
            Err(e) => {
                warn!("Estimate service failed, using fallback table: {}", e);
                fallback_cost_tiers(details)
            }
        }
    }

    /// FieldBot: a location-adjusted estimate in the fixed FieldBot template.
    /// Failures become one of the canned replies.
    pub async fn ask_field_bot(&self, question: &str, cancel: &CancellationToken) -> String {
        let call = self
            .estimator
            .answer_site_question(FIELD_BOT_INSTRUCTION, question.trim());
        match bounded(call, self.timeout, cancel).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("FieldBot answer was empty");
                FIELD_BOT_EMPTY_REPLY.to_string()
            }
            Err(e) => {
                warn!("FieldBot request failed: {}", e);
                FIELD_BOT_OFFLINE_REPLY.to_string()
            }
        }
    }

    /// One layout per style, requested in parallel. Failed styles are left out.
    pub async fn request_layout_images(
        &self,
        details: &ConstructionDetails,
        styles: &[&str],
        cancel: &CancellationToken,
    ) -> LayoutBatch {
        let styles: Vec<&str> = if styles.is_empty() {
            DEFAULT_LAYOUT_STYLES.to_vec()
        } else {
            styles.iter().copied().take(MAX_LAYOUT_STYLES).collect()
        };

        let requests = styles.iter().map(|style| {
            let prompt = build_layout_prompt(details, style);
            async move {
                let call = self.layouts.generate_layout(&prompt, LAYOUT_ASPECT_RATIO);
                (style.to_string(), bounded(call, self.timeout, cancel).await)
            }
        });

        let mut batch = LayoutBatch::default();
        for (style_name, result) in join_all(requests).await {
            match result {
                Ok(url) => batch.options.push(LayoutOption { url, style_name }),
                Err(e) => {
                    warn!("Layout generation for '{}' failed: {}", style_name, e);
                    batch.failed += 1;
                }
            }
        }
        if batch.is_empty() {
            warn!("Could not generate any layouts ({} styles failed)", batch.failed);
        }
        batch
    }
}

/// Runs an external call under a timeout and a cancellation token.
async fn bounded<T>(
    call: impl Future<Output = PortResult<T>>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> PortResult<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PortError::Unexpected("request cancelled".to_string())),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(inner) => inner,
            Err(_) => Err(PortError::Unexpected(format!("timed out after {:?}", timeout))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingEstimator;

    #[async_trait]
    impl CostEstimationService for FailingEstimator {
        async fn generate_cost_tiers(&self, _prompt: &str) -> PortResult<Vec<CostTier>> {
            Err(PortError::Unexpected("503 Service Unavailable".to_string()))
        }

        async fn answer_site_question(&self, _system: &str, _question: &str) -> PortResult<String> {
            Err(PortError::Unexpected("503 Service Unavailable".to_string()))
        }
    }

    struct FixedEstimator(Vec<CostTier>);

    #[async_trait]
    impl CostEstimationService for FixedEstimator {
        async fn generate_cost_tiers(&self, _prompt: &str) -> PortResult<Vec<CostTier>> {
            Ok(self.0.clone())
        }

        /// Echoes the question, or nothing when the tier list is empty.
        async fn answer_site_question(&self, system: &str, question: &str) -> PortResult<String> {
            if self.0.is_empty() {
                return Ok("   ".to_string());
            }
            assert!(system.starts_with("You are FieldBot"));
            Ok(format!("Location Type: Tier2\n{}\n", question))
        }
    }

    struct SlowEstimator;

    #[async_trait]
    impl CostEstimationService for SlowEstimator {
        async fn generate_cost_tiers(&self, _prompt: &str) -> PortResult<Vec<CostTier>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn answer_site_question(&self, _system: &str, _question: &str) -> PortResult<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    /// Fails every `fail_every`-th call (1-based).
    struct FlakyLayouts {
        calls: AtomicUsize,
        fail_every: usize,
    }

    #[async_trait]
    impl LayoutGenerationService for FlakyLayouts {
        async fn generate_layout(&self, prompt: &str, _aspect_ratio: &str) -> PortResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_every > 0 && n % self.fail_every == 0 {
                return Err(PortError::Unexpected("no image in response".to_string()));
            }
            Ok(format!("data:image/png;base64,{}", prompt.len()))
        }
    }

    fn engine(estimator: Arc<dyn CostEstimationService>, fail_every: usize) -> EstimateEngine {
        let layouts = Arc::new(FlakyLayouts {
            calls: AtomicUsize::new(0),
            fail_every,
        });
        EstimateEngine::new(estimator, layouts, Duration::from_secs(5))
    }

    #[test]
    fn token_amount_matches_worked_example() {
        assert_eq!(token_amount(2_800_000, 1_200_000, 10), 400_000);
        assert_eq!(token_amount(1_000, 0, 5), 50);
        // 0.15 × 333 = 49.95
        assert_eq!(token_amount(333, 0, 15), 50);
    }

    #[test]
    fn token_amount_does_not_overflow_on_huge_costs() {
        assert_eq!(token_amount(1_000_000_000_000_000_000, 0, 10), 100_000_000_000_000_000);
        assert_eq!(token_amount(i64::MAX, i64::MAX, 15), i64::MAX);
    }

    #[test]
    fn fallback_economy_tier_is_deterministic() {
        let details = ConstructionDetails::default();
        let tiers = fallback_cost_tiers(&details);
        assert_eq!(tiers.len(), TIER_COUNT);
        assert_eq!(tiers[0].label, "Economy");
        assert_eq!(tiers[0].material_cost, 1_024_000);
        // (1000 × 800 + 2 × 25000) × 0.85
        assert_eq!(tiers[0].labor_cost, 722_500);
        assert_eq!(tiers[4].label, "Ultra-Luxury");
        assert_eq!(tiers[4].material_cost, 3_200_000);
    }

    #[test]
    fn raw_tiers_are_clamped() {
        let tier = tier_from_raw(" Premium ", -5.0, f64::NAN, "ok");
        assert_eq!(tier.label, "Premium");
        assert_eq!(tier.material_cost, 0);
        assert_eq!(tier.labor_cost, 0);
    }

    #[test]
    fn cost_prompt_mentions_every_floor_and_context() {
        let mut details = ConstructionDetails::default();
        details.set_floors(2).unwrap();
        details.location = Some("Pune".to_string());
        let prompt = build_cost_prompt(&details);
        assert!(prompt.contains("Floor 1: 2 Rooms"));
        assert!(prompt.contains("Floor 2: 2 Rooms, 1 Bathrooms, Kitchen: Without Chimney"));
        assert!(prompt.contains("Location: Pune"));
        assert!(prompt.contains("Timeline: 12 months"));
        assert!(prompt.contains("Additional Notes: None"));
    }

    #[tokio::test]
    async fn failing_service_falls_back_to_formula() {
        let details = ConstructionDetails::default();
        let tiers = engine(Arc::new(FailingEstimator), 0)
            .request_cost_tiers(&details, &CancellationToken::new())
            .await;
        assert_eq!(tiers, fallback_cost_tiers(&details));
    }

    #[tokio::test]
    async fn ai_tiers_are_used_when_valid() {
        let ai = vec![
            tier_from_raw("Economy", 900_000.0, 500_000.0, "basic"),
            tier_from_raw("", 1.0, 1.0, "unlabeled"),
        ];
        let tiers = engine(Arc::new(FixedEstimator(ai)), 0)
            .request_cost_tiers(&ConstructionDetails::default(), &CancellationToken::new())
            .await;
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].material_cost, 900_000);
    }

    #[tokio::test]
    async fn empty_ai_answer_falls_back() {
        let details = ConstructionDetails::default();
        let tiers = engine(Arc::new(FixedEstimator(Vec::new())), 0)
            .request_cost_tiers(&details, &CancellationToken::new())
            .await;
        assert_eq!(tiers.len(), TIER_COUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_times_out_into_fallback() {
        let details = ConstructionDetails::default();
        let tiers = engine(Arc::new(SlowEstimator), 0)
            .request_cost_tiers(&details, &CancellationToken::new())
            .await;
        assert_eq!(tiers[0].material_cost, 1_024_000);
    }

    #[tokio::test]
    async fn cancelled_request_falls_back() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let tiers = engine(Arc::new(SlowEstimator), 0)
            .request_cost_tiers(&ConstructionDetails::default(), &cancel)
            .await;
        assert_eq!(tiers.len(), TIER_COUNT);
    }

    #[tokio::test]
    async fn field_bot_answers_with_trimmed_text() {
        let answer = engine(Arc::new(FixedEstimator(fallback_cost_tiers(&ConstructionDetails::default()))), 0)
            .ask_field_bot("  Nashik, 422001 ", &CancellationToken::new())
            .await;
        assert_eq!(answer, "Location Type: Tier2\nNashik, 422001");
    }

    #[tokio::test]
    async fn field_bot_failures_become_canned_replies() {
        let cancel = CancellationToken::new();
        let offline = engine(Arc::new(FailingEstimator), 0).ask_field_bot("Pune", &cancel).await;
        assert_eq!(offline, FIELD_BOT_OFFLINE_REPLY);

        let empty = engine(Arc::new(FixedEstimator(Vec::new())), 0).ask_field_bot("Pune", &cancel).await;
        assert_eq!(empty, FIELD_BOT_EMPTY_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_field_bot_times_out_into_offline_reply() {
        let answer = engine(Arc::new(SlowEstimator), 0)
            .ask_field_bot("Jaipur", &CancellationToken::new())
            .await;
        assert_eq!(answer, FIELD_BOT_OFFLINE_REPLY);
    }

    #[tokio::test]
    async fn one_failed_style_leaves_two_layouts() {
        let batch = engine(Arc::new(FailingEstimator), 3)
            .request_layout_images(&ConstructionDetails::default(), &DEFAULT_LAYOUT_STYLES, &CancellationToken::new())
            .await;
        assert_eq!(batch.options.len(), 2);
        assert_eq!(batch.failed, 1);
    }

    #[tokio::test]
    async fn all_styles_failing_is_an_empty_batch_not_an_error() {
        let batch = engine(Arc::new(FailingEstimator), 1)
            .request_layout_images(&ConstructionDetails::default(), &["Modern Minimalist"], &CancellationToken::new())
            .await;
        assert!(batch.is_empty());
        assert_eq!(batch.failed, 1);
    }

    #[tokio::test]
    async fn style_list_is_capped_at_three() {
        let styles = ["a", "b", "c", "d"];
        let batch = engine(Arc::new(FailingEstimator), 0)
            .request_layout_images(&ConstructionDetails::default(), &styles, &CancellationToken::new())
            .await;
        assert_eq!(batch.options.len(), MAX_LAYOUT_STYLES);
        assert_eq!(batch.options[2].style_name, "c");
    }
}
