//! Rate law templates.
//!
//! The supported mechanisms form a closed set. [`RateLaw::for_edge`] picks the template
//! from the mechanism and the shape of the reaction; adding a template means adding a
//! variant, and every `match` over [`RateLaw`] has to handle it.
//!
//! Saturable templates are modular: the flux of an edge is
//!
//! ```text
//! [E] · mask · numerator / saturation
//! ```
//!
//! where the numerator holds the catalytic terms and the saturation the binding terms.
//! Reversible templates express the reverse catalytic constant through the Haldane
//! relationship, so they need the equilibrium constant as an auxiliary.

use crate::config::{FARADAY_CONSTANT, GAS_CONSTANT};
use crate::error::EncodingError;
use crate::model::Mechanism;
use crate::parameters::ParameterFamily;
use crate::stoich::{Catalyst, Edge, Participant};

use super::context::RateLawContext;
use super::expression::ExpressionBuilder;

/// The fixed set of rate law templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLaw {
    /// Zero-order exchange: the flux is a parameter.
    FixedFlux,
    /// Reversible, one substrate and one product with unit coefficients.
    UniUni,
    /// Reversible with any other shape, e.g. ordered bi-bi.
    ReversibleModular,
    /// Irreversible saturable kinetics.
    IrreversibleModular,
}

/// Numerator and saturation of a saturable template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kinetics {
    pub numerator: String,
    pub saturation: String,
}

impl RateLaw {
    /// Chooses the template for an edge.
    pub fn for_edge(edge: &Edge) -> Self {
        match edge.mechanism {
            Mechanism::Drain => RateLaw::FixedFlux,
            Mechanism::IrreversibleSaturating => RateLaw::IrreversibleModular,
            Mechanism::ReversibleSaturating => {
                let unit = |participants: &[Participant]| {
                    participants.len() == 1 && participants[0].coefficient == 1.0
                };
                if unit(&edge.substrates) && unit(&edge.products) {
                    RateLaw::UniUni
                } else {
                    RateLaw::ReversibleModular
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RateLaw::FixedFlux => "fixed_flux",
            RateLaw::UniUni => "uni_uni",
            RateLaw::ReversibleModular => "reversible_modular",
            RateLaw::IrreversibleModular => "irreversible_modular",
        }
    }

    pub fn is_reversible(&self) -> bool {
        matches!(self, RateLaw::UniUni | RateLaw::ReversibleModular)
    }

    /// Generates the numerator and saturation of a saturable template.
    ///
    /// Reversible templates define `keq` and `kcat_rev` on `builder` first.
    ///
    /// # Arguments
    ///
    /// * `edge` - The edge, which must have a catalyst
    /// * `catalyst` - The enzyme of the edge
    /// * `ctx` - Name resolution
    /// * `builder` - Receives the auxiliaries of the template
    ///
    /// # Returns
    ///
    /// The kinetic terms, or `None` for [`RateLaw::FixedFlux`].
    pub(crate) fn kinetics(
        &self,
        edge: &Edge,
        catalyst: &Catalyst,
        ctx: &RateLawContext,
        builder: &mut ExpressionBuilder,
    ) -> Result<Option<Kinetics>, EncodingError> {
        let kcat = ctx.parameter(ParameterFamily::Kcat, catalyst.enzyme_reaction_code)?;
        let substrates = binding_terms(&edge.substrates, catalyst, ctx)?;

        let kinetics = match self {
            RateLaw::FixedFlux => return Ok(None),
            RateLaw::IrreversibleModular => Kinetics {
                numerator: format!("{kcat}*{}", product_of(&substrates, BindingTerm::ratio)),
                saturation: product_of(&substrates, BindingTerm::saturation),
            },
            RateLaw::UniUni => {
                let products = binding_terms(&edge.products, catalyst, ctx)?;
                let (a, p) = (&substrates[0], &products[0]);

                define_keq(edge, ctx, builder)?;
                let kcat_rev = builder.define("kcat_rev", &["keq"], |deps| {
                    format!("{kcat}*{}/({}*{})", p.km, a.km, deps[0])
                })?;

                Kinetics {
                    numerator: format!(
                        "{kcat}*{}/{} - {kcat_rev}*{}/{}",
                        a.concentration, a.km, p.concentration, p.km
                    ),
                    saturation: format!(
                        "1 + {}/{} + {}/{}",
                        a.concentration, a.km, p.concentration, p.km
                    ),
                }
            }
            RateLaw::ReversibleModular => {
                let products = binding_terms(&edge.products, catalyst, ctx)?;

                define_keq(edge, ctx, builder)?;
                let kcat_rev = builder.define("kcat_rev", &["keq"], |deps| {
                    format!(
                        "{kcat}*{}/({}*{})",
                        product_of(&products, BindingTerm::constant),
                        product_of(&substrates, BindingTerm::constant),
                        deps[0]
                    )
                })?;

                Kinetics {
                    numerator: format!(
                        "{kcat}*{} - {kcat_rev}*{}",
                        product_of(&substrates, BindingTerm::ratio),
                        product_of(&products, BindingTerm::ratio)
                    ),
                    saturation: format!(
                        "{} + {} - 1",
                        product_of(&substrates, BindingTerm::saturation),
                        product_of(&products, BindingTerm::saturation)
                    ),
                }
            }
        };

        Ok(Some(kinetics))
    }
}

/// Defines the equilibrium constant of an edge from formation energies.
///
/// `keq = exp(-ΔrG / (R T))` with `ΔrG = Σ ν·dgf + water·dgf_water + charge·F·psi`.
fn define_keq(
    edge: &Edge,
    ctx: &RateLawContext,
    builder: &mut ExpressionBuilder,
) -> Result<String, EncodingError> {
    let mut terms = edge
        .signed_participants()
        .map(|(p, coefficient)| Ok(format!("{coefficient:?}*{}", ctx.dgf(p.mic_code)?)))
        .collect::<Result<Vec<_>, EncodingError>>()?;

    if edge.water_stoichiometry != 0.0 {
        terms.push(format!(
            "{:?}*{:?}",
            edge.water_stoichiometry,
            ctx.dgf_water()
        ));
    }
    if edge.transported_charge != 0.0 {
        terms.push(format!(
            "{:?}*{FARADAY_CONSTANT:?}*{}",
            edge.transported_charge,
            ctx.parameter(ParameterFamily::Psi, 1)?
        ));
    }

    let temperature = ctx.temperature();
    builder.define("keq", &[], |_| {
        format!(
            "exp(-({}) / ({GAS_CONSTANT:?}*{temperature}))",
            terms.join(" + ")
        )
    })
}

/// One substrate or product with its resolved accesses.
#[derive(Debug, Clone)]
struct BindingTerm {
    concentration: String,
    km: String,
    coefficient: f64,
}

impl BindingTerm {
    /// `(S/Km)^n`
    fn ratio(&self) -> String {
        power(&format!("{}/{}", self.concentration, self.km), self.coefficient)
    }

    /// `(1 + S/Km)^n`
    fn saturation(&self) -> String {
        power(
            &format!("(1 + {}/{})", self.concentration, self.km),
            self.coefficient,
        )
    }

    /// `Km^n`
    fn constant(&self) -> String {
        power(&self.km, self.coefficient)
    }
}

fn binding_terms(
    participants: &[Participant],
    catalyst: &Catalyst,
    ctx: &RateLawContext,
) -> Result<Vec<BindingTerm>, EncodingError> {
    participants
        .iter()
        .map(|p| {
            Ok(BindingTerm {
                concentration: ctx.metabolite(p.mic_code),
                km: ctx.km(&catalyst.enzyme_id, &p.mic_id)?,
                coefficient: p.coefficient,
            })
        })
        .collect()
}

fn product_of(terms: &[BindingTerm], render: fn(&BindingTerm) -> String) -> String {
    if terms.is_empty() {
        return "1".to_string();
    }
    terms.iter().map(render).collect::<Vec<_>>().join("*")
}

/// Renders `base^exponent`, omitting the power for unit exponents.
pub(crate) fn power(base: &str, exponent: f64) -> String {
    if exponent == 1.0 {
        base.to_string()
    } else {
        format!("pow({base}, {exponent:?})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(mic: &str, code: usize, coefficient: f64) -> Participant {
        Participant {
            mic_id: mic.to_string(),
            mic_code: code,
            coefficient,
        }
    }

    fn edge(mechanism: Mechanism, substrates: Vec<Participant>, products: Vec<Participant>) -> Edge {
        Edge {
            id: "e_r".to_string(),
            code: 1,
            reaction_id: "r".to_string(),
            reaction_code: 1,
            mechanism,
            catalyst: None,
            drain_code: None,
            substrates,
            products,
            water_stoichiometry: 0.0,
            transported_charge: 0.0,
            competitive_inhibitors: Vec::new(),
            allosteric_regulators: Vec::new(),
            phosphorylations: Vec::new(),
        }
    }

    #[test]
    fn test_template_selection() {
        let uni = edge(
            Mechanism::ReversibleSaturating,
            vec![participant("a_c", 1, 1.0)],
            vec![participant("b_c", 2, 1.0)],
        );
        assert_eq!(RateLaw::for_edge(&uni), RateLaw::UniUni);

        let bi_bi = edge(
            Mechanism::ReversibleSaturating,
            vec![participant("a_c", 1, 1.0), participant("b_c", 2, 1.0)],
            vec![participant("c_c", 3, 1.0), participant("d_c", 4, 1.0)],
        );
        assert_eq!(RateLaw::for_edge(&bi_bi), RateLaw::ReversibleModular);

        let dimerisation = edge(
            Mechanism::ReversibleSaturating,
            vec![participant("a_c", 1, 2.0)],
            vec![participant("b_c", 2, 1.0)],
        );
        assert_eq!(RateLaw::for_edge(&dimerisation), RateLaw::ReversibleModular);

        let irreversible = edge(
            Mechanism::IrreversibleSaturating,
            vec![participant("a_c", 1, 1.0)],
            vec![],
        );
        assert_eq!(RateLaw::for_edge(&irreversible), RateLaw::IrreversibleModular);

        let drain = edge(Mechanism::Drain, vec![], vec![participant("a_c", 1, 1.0)]);
        assert_eq!(RateLaw::for_edge(&drain), RateLaw::FixedFlux);
        assert!(!RateLaw::FixedFlux.is_reversible());
    }

    #[test]
    fn test_power_rendering() {
        assert_eq!(power("x", 1.0), "x");
        assert_eq!(power("x", 2.0), "pow(x, 2.0)");
        assert_eq!(power("(1 + x)", 0.5), "pow((1 + x), 0.5)");
    }

    #[test]
    fn test_binding_term_products() {
        let terms = vec![
            BindingTerm {
                concentration: "metabolite[1]".to_string(),
                km: "parameter[2]".to_string(),
                coefficient: 1.0,
            },
            BindingTerm {
                concentration: "metabolite[3]".to_string(),
                km: "parameter[4]".to_string(),
                coefficient: 2.0,
            },
        ];

        assert_eq!(
            product_of(&terms, BindingTerm::ratio),
            "metabolite[1]/parameter[2]*pow(metabolite[3]/parameter[4], 2.0)"
        );
        assert_eq!(
            product_of(&terms, BindingTerm::saturation),
            "(1 + metabolite[1]/parameter[2])*pow((1 + metabolite[3]/parameter[4]), 2.0)"
        );
        assert_eq!(
            product_of(&terms, BindingTerm::constant),
            "parameter[2]*pow(parameter[4], 2.0)"
        );
        assert_eq!(product_of(&[], BindingTerm::ratio), "1");
    }
}
