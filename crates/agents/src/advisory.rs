use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arogya_core::{
    render_template, GenerationFailure, GenerationPort, GenerationRequest, SearchHit, SearchPort,
};
use arogya_observability::AppMetrics;
use tracing::{debug, warn};

/// Inserted in place of search results when search failed or found nothing.
pub const NO_SEARCH_RESULTS: &str = "No search results available. \
Answer from general knowledge and say that current details could not be verified online.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryKind {
    GovernmentScheme,
    MentalWellness,
    Yoga,
    Ayush,
    FacilityLocator,
}

impl AdvisoryKind {
    pub const ALL: [AdvisoryKind; 5] = [
        AdvisoryKind::GovernmentScheme,
        AdvisoryKind::MentalWellness,
        AdvisoryKind::Yoga,
        AdvisoryKind::Ayush,
        AdvisoryKind::FacilityLocator,
    ];

    /// Registration name, also passed to the Generation Port as `advisor`.
    pub fn name(self) -> &'static str {
        match self {
            Self::GovernmentScheme => "government_scheme",
            Self::MentalWellness => "mental_wellness",
            Self::Yoga => "yoga",
            Self::Ayush => "ayush",
            Self::FacilityLocator => "facility_locator",
        }
    }

    fn search_template(self) -> &'static str {
        match self {
            Self::GovernmentScheme => "India government health schemes {query}",
            Self::MentalWellness => "mental health support resources India {query}",
            Self::Yoga => "yoga therapy recommendations {query}",
            Self::Ayush => "AYUSH ministry India schemes {query}",
            Self::FacilityLocator => "hospitals healthcare facilities near {query}",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            Self::GovernmentScheme => {
                "You are a government healthcare scheme advisor for India.\n\n\
                 Based on the user query and search results:\n\
                 1. Identify relevant government health schemes\n\
                 2. Explain eligibility criteria\n\
                 3. Provide official links and application process\n\n\
                 Search results available:\n{search_results}"
            }
            Self::MentalWellness => {
                "You are a compassionate mental wellness counselor.\n\n\
                 Provide:\n\
                 1. Empathetic acknowledgment\n\
                 2. Evidence-based coping strategies\n\
                 3. Professional help resources\n\
                 4. Indian mental health helplines (Tele-MANAS: 14416, KIRAN: 1800-599-0019)\n\n\
                 Use search results for current resources:\n{search_results}"
            }
            Self::Yoga => {
                "You are a certified yoga instructor.\n\n\
                 Provide:\n\
                 1. Specific yoga poses (asanas)\n\
                 2. Breathing exercises (pranayama)\n\
                 3. Safety precautions\n\
                 4. Duration and frequency\n\n\
                 Search results:\n{search_results}"
            }
            Self::Ayush => {
                "You are an AYUSH (Ayurveda, Yoga, Unani, Siddha, Homeopathy) advisor.\n\n\
                 Provide:\n\
                 1. Traditional remedies and treatments\n\
                 2. Dietary recommendations\n\
                 3. Lifestyle modifications\n\
                 4. Precautions and contraindications\n\n\
                 Search results:\n{search_results}"
            }
            Self::FacilityLocator => {
                "You are a healthcare facility locator.\n\n\
                 Provide:\n\
                 1. Extract location from user query\n\
                 2. Search for nearby healthcare facilities\n\
                 3. List hospitals with address, contact, and specialties\n\n\
                 Search results:\n{search_results}"
            }
        }
    }

    pub fn search_query(self, text: &str) -> String {
        let context = BTreeMap::from([("query".to_string(), text.trim().to_string())]);
        render_template(self.search_template(), &context)
    }
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Search, then one generation call grounded in the results.
#[derive(Clone)]
pub struct AdvisoryGenerator {
    kind: AdvisoryKind,
    generation: Arc<dyn GenerationPort>,
    search: Arc<dyn SearchPort>,
    max_results: usize,
    metrics: Arc<AppMetrics>,
}

impl AdvisoryGenerator {
    pub fn new(
        kind: AdvisoryKind,
        generation: Arc<dyn GenerationPort>,
        search: Arc<dyn SearchPort>,
        max_results: usize,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            kind,
            generation,
            search,
            max_results,
            metrics,
        }
    }

    pub fn kind(&self) -> AdvisoryKind {
        self.kind
    }

    /// Search problems never abort the call; only a generation failure does.
    pub async fn run(&self, text: &str) -> Result<String, GenerationFailure> {
        let search_query = self.kind.search_query(text);
        let search_results = match self.search.search(&search_query, self.max_results).await {
            Ok(hits) if !hits.is_empty() => render_hits(&hits),
            Ok(_) => {
                debug!(advisor = %self.kind, "search returned no results");
                self.metrics.inc_search_fallback();
                NO_SEARCH_RESULTS.to_string()
            }
            Err(failure) => {
                warn!(advisor = %self.kind, error = %failure, "search failed, continuing without results");
                self.metrics.inc_search_fallback();
                NO_SEARCH_RESULTS.to_string()
            }
        };

        let request = GenerationRequest::new(self.kind.system_prompt(), text)
            .with_context("search_results", search_results)
            .with_context("advisor", self.kind.name());

        self.metrics.inc_advisory_call();
        self.generation.generate(&request).await
    }
}

fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(idx, hit)| format!("{}. {}\n   {}\n   Source: {}", idx + 1, hit.title, hit.snippet, hit.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The five configured advisors, one named slot each.
#[derive(Clone)]
pub struct AdvisoryBoard {
    pub government_scheme: AdvisoryGenerator,
    pub mental_wellness: AdvisoryGenerator,
    pub yoga: AdvisoryGenerator,
    pub ayush: AdvisoryGenerator,
    pub facility_locator: AdvisoryGenerator,
}

impl AdvisoryBoard {
    pub fn new(
        generation: Arc<dyn GenerationPort>,
        search: Arc<dyn SearchPort>,
        max_results: usize,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        let build = |kind| {
            AdvisoryGenerator::new(
                kind,
                generation.clone(),
                search.clone(),
                max_results,
                metrics.clone(),
            )
        };

        Self {
            government_scheme: build(AdvisoryKind::GovernmentScheme),
            mental_wellness: build(AdvisoryKind::MentalWellness),
            yoga: build(AdvisoryKind::Yoga),
            ayush: build(AdvisoryKind::Ayush),
            facility_locator: build(AdvisoryKind::FacilityLocator),
        }
    }

    pub fn get(&self, kind: AdvisoryKind) -> &AdvisoryGenerator {
        match kind {
            AdvisoryKind::GovernmentScheme => &self.government_scheme,
            AdvisoryKind::MentalWellness => &self.mental_wellness,
            AdvisoryKind::Yoga => &self.yoga,
            AdvisoryKind::Ayush => &self.ayush,
            AdvisoryKind::FacilityLocator => &self.facility_locator,
        }
    }
}
