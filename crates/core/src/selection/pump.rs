use crate::domain::pump::{normalize_pump_model, PumpRecord};
use crate::domain::selection::{PumpMatch, PumpSelection};
use crate::selection::gearbox::SelectionEngine;

impl SelectionEngine<'_> {
    /// Recommended pump for the gearbox, matched exactly then by normalised model.
    /// Without a usable recommendation the first pump above the minimum flow is offered.
    pub fn select_pump(&self, gearbox_model: &str, pumps: &[PumpRecord]) -> PumpSelection {
        let recommended_model = self.reference.recommended_pump(gearbox_model);
        let mut warnings = Vec::new();

        let recommended = recommended_model.as_deref().and_then(|model| find_pump(pumps, model));
        let min_flow = self.tolerances.pump_fallback_min_flow;
        let (pump, match_kind) = match recommended {
            Some(pump) => (Some(pump), Some(PumpMatch::Recommended)),
            None => {
                let fallback = pumps.iter().find(|pump| {
                    pump.flow.is_some_and(|flow| flow.is_finite() && flow > min_flow)
                });
                if let Some(pump) = fallback {
                    tracing::warn!(
                        event_name = "selection.pump.fallback",
                        gearbox = gearbox_model,
                        recommended = recommended_model.as_deref().unwrap_or("none"),
                        pump = %pump.model,
                        "recommended pump unavailable; using flow fallback"
                    );
                    warnings.push(match recommended_model.as_deref() {
                        Some(model) => format!(
                            "recommended pump {model} is not in the catalog; \
                             {} chosen by flow instead",
                            pump.model
                        ),
                        None => format!(
                            "no pump recommendation for gearbox {gearbox_model}; \
                             {} chosen by flow",
                            pump.model
                        ),
                    });
                }
                (fallback, fallback.map(|_| PumpMatch::FlowFallback))
            }
        };

        let message = match (pump, match_kind) {
            (Some(pump), Some(PumpMatch::Recommended)) => {
                format!("selected recommended pump {} for gearbox {gearbox_model}", pump.model)
            }
            (Some(pump), _) => {
                format!("selected fallback pump {} for gearbox {gearbox_model}", pump.model)
            }
            (None, _) => format!("no standby pump available for gearbox {gearbox_model}"),
        };

        PumpSelection {
            gearbox_model: gearbox_model.to_string(),
            recommended_model,
            factory_price: pump.and_then(|pump| self.pricing.factory_price(&pump.pricing)),
            pump: pump.cloned(),
            match_kind,
            warnings,
            message,
        }
    }
}

fn find_pump<'p>(pumps: &'p [PumpRecord], model: &str) -> Option<&'p PumpRecord> {
    pumps.iter().find(|pump| pump.model == model).or_else(|| {
        let normalized = normalize_pump_model(model);
        pumps.iter().find(|pump| pump.normalized_model() == normalized)
    })
}
