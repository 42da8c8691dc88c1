//! Rate Law & Flux Generator
//!
//! Turns every edge of the network into its ordered auxiliary expressions and its flux
//! expression. Enzymatic fluxes have the form
//!
//! ```text
//! [E] * mask * numerator * (free_enzyme_ratio | 1/saturation) * allostery * phosphorylation
//! ```
//!
//! where the regulatory factors only appear when the edge is regulated that way. All
//! names are resolved through [`RateLawContext`] before any text is produced.

use crate::error::EncodingError;
use crate::parameters::ParameterFamily;
use crate::stoich::{Edge, Network};

use super::context::RateLawContext;
use super::expression::{EdgeExpressions, ExpressionBuilder};
use super::regulation::{allostery, free_enzyme_ratio, phosphorylation};
use super::template::RateLaw;

/// Generates the expressions of every edge, in edge code order.
pub fn generate_fluxes(
    network: &Network,
    ctx: &RateLawContext,
) -> Result<Vec<EdgeExpressions>, EncodingError> {
    let expressions = network
        .edges()
        .iter()
        .map(|edge| generate_edge(edge, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Generated {} flux expressions with {} auxiliaries",
        expressions.len(),
        expressions.iter().map(|e| e.auxiliaries.len()).sum::<usize>()
    );

    Ok(expressions)
}

/// Generates the auxiliaries and the flux of a single edge.
pub fn generate_edge(edge: &Edge, ctx: &RateLawContext) -> Result<EdgeExpressions, EncodingError> {
    let rate_law = RateLaw::for_edge(edge);
    let mut builder = ExpressionBuilder::new(edge.code);

    let Some(catalyst) = &edge.catalyst else {
        let drain_code = match (rate_law, edge.drain_code) {
            (RateLaw::FixedFlux, Some(code)) => code,
            _ => {
                return Err(EncodingError::UnknownId {
                    space: "drain".to_string(),
                    id: edge.id.clone(),
                })
            }
        };
        let flux = ctx.parameter(ParameterFamily::Drain, drain_code)?;
        return Ok(builder.finish(&edge.id, rate_law.name(), flux));
    };

    let kinetics = rate_law
        .kinetics(edge, catalyst, ctx, &mut builder)?
        .ok_or_else(|| EncodingError::UnknownId {
            space: "enzyme".to_string(),
            id: edge.id.clone(),
        })?;

    let free_enzyme_ratio = free_enzyme_ratio(edge, &kinetics.saturation, ctx, &mut builder)?;
    let allostery = allostery(
        edge,
        catalyst,
        free_enzyme_ratio.is_some(),
        ctx,
        &mut builder,
    )?;
    let phosphorylation = phosphorylation(edge, catalyst, ctx, &mut builder)?;

    let mut flux = format!(
        "{}*{}*({})",
        ctx.parameter(ParameterFamily::ConcEnzyme, catalyst.enzyme_code)?,
        ctx.enzyme_mask(catalyst.enzyme_code),
        kinetics.numerator
    );
    match &free_enzyme_ratio {
        Some(ratio) => flux.push_str(&format!("*{ratio}")),
        None => flux.push_str(&format!("/({})", kinetics.saturation)),
    }
    for factor in allostery.iter().chain(phosphorylation.iter()) {
        flux.push_str(&format!("*{factor}"));
    }

    Ok(builder.finish(&edge.id, rate_law.name(), flux))
}
