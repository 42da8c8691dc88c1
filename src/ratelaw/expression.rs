//! Ordered per-edge expressions.
//!
//! The flux of an edge may depend on auxiliary quantities (equilibrium constant, Haldane
//! relationship, free enzyme ratio, regulatory multipliers) that must be computed first.
//! [`ExpressionBuilder`] only hands out a reference to an auxiliary once it has been
//! defined, so the emitted order is a valid evaluation order by construction.

use crate::error::EncodingError;

/// A named quantity computed before the flux of its edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auxiliary {
    /// Variable name, unique across the program, e.g. `keq_3`.
    pub name: String,
    pub expression: String,
}

/// Everything generated for one edge, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeExpressions {
    pub edge_code: usize,
    pub edge_id: String,
    /// Name of the rate law template used.
    pub rate_law: &'static str,
    pub auxiliaries: Vec<Auxiliary>,
    pub flux: String,
}

/// Collects the auxiliaries of one edge in definition order.
#[derive(Debug)]
pub(crate) struct ExpressionBuilder {
    edge_code: usize,
    auxiliaries: Vec<Auxiliary>,
}

impl ExpressionBuilder {
    pub fn new(edge_code: usize) -> Self {
        Self {
            edge_code,
            auxiliaries: Vec::new(),
        }
    }

    /// Variable name of an auxiliary of this edge.
    fn variable(&self, base: &str) -> String {
        format!("{base}_{}", self.edge_code)
    }

    /// Returns the variable name of an auxiliary that is already defined.
    pub fn reference(&self, base: &str) -> Result<String, EncodingError> {
        let name = self.variable(base);
        if self.auxiliaries.iter().any(|a| a.name == name) {
            Ok(name)
        } else {
            Err(EncodingError::UndefinedAuxiliary {
                edge: self.edge_code,
                name,
            })
        }
    }

    /// Defines an auxiliary and returns its variable name.
    ///
    /// `expression` receives the resolved names of `depends_on`, in order. Fails if any
    /// of them has not been defined yet.
    pub fn define<F>(
        &mut self,
        base: &str,
        depends_on: &[&str],
        expression: F,
    ) -> Result<String, EncodingError>
    where
        F: FnOnce(&[String]) -> String,
    {
        let dependencies = depends_on
            .iter()
            .map(|d| self.reference(d))
            .collect::<Result<Vec<_>, _>>()?;

        let name = self.variable(base);
        self.auxiliaries.push(Auxiliary {
            name: name.clone(),
            expression: expression(&dependencies),
        });
        Ok(name)
    }

    /// Finishes the edge with its flux expression.
    pub fn finish(
        self,
        edge_id: &str,
        rate_law: &'static str,
        flux: String,
    ) -> EdgeExpressions {
        EdgeExpressions {
            edge_code: self.edge_code,
            edge_id: edge_id.to_string(),
            rate_law,
            auxiliaries: self.auxiliaries,
            flux,
        }
    }
}
