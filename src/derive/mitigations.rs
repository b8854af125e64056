//! Kernel command-line mitigation flags

use super::{string_fact, Deriver};
use crate::enrich::Extraction;
use crate::model::{Fact, Run};
use crate::Result;

const CMDLINE: &str = "cmdline";
const SMP_ACTIVE: &str = "lscpu_smp_active";

/// `asi_on` is true iff the cmdline carries `mitigations=auto` together
/// with `nosmt`, in either order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsiOnDeriver;

impl Deriver for AsiOnDeriver {
    fn name(&self) -> &'static str {
        "asi_on"
    }

    fn derive(&self, run: &Run) -> Result<Extraction> {
        let Some(cmdline) = string_fact(run, self.name(), CMDLINE) else {
            return Ok(Extraction::default());
        };

        let asi_on = cmdline.contains("mitigations=auto,nosmt")
            || cmdline.contains("nosmt,mitigations=auto");
        tracing::debug!(run = %run.key(), asi_on, "derived asi_on");

        Ok(Extraction::from_facts(vec![Fact::new("asi_on", asi_on)]))
    }
}

/// Outcome of [`RetbleedMitigationDeriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetbleedMitigation {
    /// `retbleed=off`
    Off,
    /// Untrained return thunk
    Unret,
    /// Single-thread indirect branch predictors
    Stibp,
    /// Indirect branch prediction barrier
    Ibpb,
    /// No recognized `retbleed=` option
    Unknown,
}

impl RetbleedMitigation {
    /// Classify a cmdline. Patterns are tested in a fixed order and the
    /// first match wins.
    #[must_use]
    pub fn classify(cmdline: &str, smp_active: bool) -> Self {
        let smt_dependent = if smp_active { Self::Stibp } else { Self::Unret };

        if cmdline.contains("retbleed=off") {
            Self::Off
        } else if cmdline.contains("retbleed=auto,nosmt") {
            smt_dependent
        } else if cmdline.contains("retbleed=ibpb") {
            Self::Ibpb
        } else if cmdline.contains("retbleed=unret") {
            smt_dependent
        } else if cmdline.contains("retbleed=unret,nosmt") {
            // unreachable: `retbleed=unret` already matched
            Self::Stibp
        } else {
            Self::Unknown
        }
    }

    /// Fact value for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Unret => "unret",
            Self::Stibp => "stibp",
            Self::Ibpb => "ibpb",
            Self::Unknown => "unknown",
        }
    }
}

/// `retbleed_mitigation` from the cmdline, using `lscpu_smp_active`
/// (default false) to resolve SMT-dependent outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetbleedMitigationDeriver;

impl Deriver for RetbleedMitigationDeriver {
    fn name(&self) -> &'static str {
        "retbleed_mitigation"
    }

    fn derive(&self, run: &Run) -> Result<Extraction> {
        let Some(cmdline) = string_fact(run, self.name(), CMDLINE) else {
            return Ok(Extraction::default());
        };

        let smp_active = match run.fact(SMP_ACTIVE).map(|fact| fact.value().as_bool()) {
            Some(Some(active)) => active,
            Some(None) => {
                tracing::debug!(run = %run.key(), "lscpu_smp_active is not a boolean, defaulting to false");
                false
            }
            None => false,
        };

        let mitigation = RetbleedMitigation::classify(cmdline, smp_active);
        tracing::debug!(run = %run.key(), smp_active, mitigation = mitigation.as_str(), "derived retbleed_mitigation");

        Ok(Extraction::from_facts(vec![Fact::new(
            "retbleed_mitigation",
            mitigation.as_str(),
        )]))
    }
}
