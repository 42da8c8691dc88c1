//! Regulatory auxiliaries: competitive inhibition, allostery and phosphorylation.
//!
//! Each function defines at most one auxiliary on the edge's [`ExpressionBuilder`] and
//! returns its variable name, or `None` when the edge is not regulated that way.

use crate::error::EncodingError;
use crate::model::ModificationType;
use crate::parameters::ParameterFamily;
use crate::stoich::{Catalyst, Edge};

use super::context::RateLawContext;
use super::expression::ExpressionBuilder;
use super::template::power;

/// Free enzyme ratio under competitive inhibition.
///
/// `1 / (saturation + Σ I/Ki)`
pub(crate) fn free_enzyme_ratio(
    edge: &Edge,
    saturation: &str,
    ctx: &RateLawContext,
    builder: &mut ExpressionBuilder,
) -> Result<Option<String>, EncodingError> {
    if edge.competitive_inhibitors.is_empty() {
        return Ok(None);
    }

    let inhibition = edge
        .competitive_inhibitors
        .iter()
        .map(|ci| {
            Ok(format!(
                "{}/{}",
                ctx.metabolite(ci.mic_code),
                ctx.parameter(ParameterFamily::Ki, ci.code)?
            ))
        })
        .collect::<Result<Vec<_>, EncodingError>>()?;

    builder
        .define("free_enzyme_ratio", &[], |_| {
            format!("1/({saturation} + {})", inhibition.join(" + "))
        })
        .map(Some)
}

/// Allosteric multiplier of the Monod-Wyman-Changeux form.
///
/// `1 / (1 + L * (ratio * (1 + Π I/Kd) / (1 + Π A/Kd))^subunits)`
///
/// `ratio` is the free enzyme ratio when the edge defines one. The transfer constant
/// `L` belongs to the enzyme, so every edge of an allosterically regulated enzyme
/// reads the same parameter.
pub(crate) fn allostery(
    edge: &Edge,
    catalyst: &Catalyst,
    has_free_enzyme_ratio: bool,
    ctx: &RateLawContext,
    builder: &mut ExpressionBuilder,
) -> Result<Option<String>, EncodingError> {
    if edge.allosteric_regulators.is_empty() {
        return Ok(None);
    }

    let bound = |modification_type: ModificationType| {
        let terms = edge
            .allosteric_regulators
            .iter()
            .filter(|r| r.modification_type == modification_type)
            .map(|r| {
                Ok(format!(
                    "{}/{}",
                    ctx.metabolite(r.mic_code),
                    ctx.parameter(ParameterFamily::DissociationConstant, r.code)?
                ))
            })
            .collect::<Result<Vec<_>, EncodingError>>()?;

        Ok::<_, EncodingError>(if terms.is_empty() {
            "1".to_string()
        } else {
            format!("(1 + {})", terms.join("*"))
        })
    };

    let inhibition = bound(ModificationType::Inhibition)?;
    let activation = bound(ModificationType::Activation)?;
    let transfer_constant =
        ctx.parameter_by_id(ParameterFamily::TransferConstant, &catalyst.enzyme_id)?;
    let depends_on: &[&str] = if has_free_enzyme_ratio {
        &["free_enzyme_ratio"]
    } else {
        &[]
    };

    builder
        .define("allostery", depends_on, |deps| {
            let ratio = match deps.first() {
                Some(free_enzyme_ratio) => format!("{free_enzyme_ratio}*{inhibition}/{activation}"),
                None => format!("{inhibition}/{activation}"),
            };
            format!(
                "1/(1 + {transfer_constant}*{})",
                power(&format!("({ratio})"), f64::from(catalyst.subunits))
            )
        })
        .map(Some)
}

/// Phosphorylation multiplier.
///
/// `1 / (1 + (Σ inhibiting / (1 + Σ activating))^subunits)` where every term is
/// `kcat_phos * [modifying enzyme] * mask` and the mask is the knockout entry of the
/// phosphorylation.
pub(crate) fn phosphorylation(
    edge: &Edge,
    catalyst: &Catalyst,
    ctx: &RateLawContext,
    builder: &mut ExpressionBuilder,
) -> Result<Option<String>, EncodingError> {
    if edge.phosphorylations.is_empty() {
        return Ok(None);
    }

    let activity = |modification_type: ModificationType| {
        let terms = edge
            .phosphorylations
            .iter()
            .filter(|p| p.modification_type == modification_type)
            .map(|p| {
                Ok(format!(
                    "{}*{}*{}",
                    ctx.parameter(ParameterFamily::KcatPhos, p.code)?,
                    ctx.parameter(ParameterFamily::ConcEnzyme, p.modifying_enzyme_code)?,
                    ctx.phosphorylation_mask(p.code)
                ))
            })
            .collect::<Result<Vec<_>, EncodingError>>()?;

        Ok::<_, EncodingError>(if terms.is_empty() {
            "0".to_string()
        } else {
            terms.join(" + ")
        })
    };

    let inhibiting = activity(ModificationType::Inhibition)?;
    let activating = activity(ModificationType::Activation)?;

    builder
        .define("phosphorylation", &[], |_| {
            format!(
                "1/(1 + {})",
                power(
                    &format!("(({inhibiting})/(1 + {activating}))"),
                    f64::from(catalyst.subunits)
                )
            )
        })
        .map(Some)
}
