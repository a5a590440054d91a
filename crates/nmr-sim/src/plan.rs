use std::fs;
use std::path::Path;

use nmr_core::errors::{ErrorInfo, NmrError};
use nmr_core::spin_system::SpinSystem;
use nmr_method::{
    from_yaml_slice, stable_hash_string, to_yaml_string, Method, MethodParams, MethodTemplate,
};
use nmr_powder::OrientationCache;
use serde::{Deserialize, Serialize};

use crate::config::SimulatorConfig;
use crate::engine::{run, CancelToken};
use crate::report::SimulationOutput;

fn io_error(code: &str, err: impl ToString) -> NmrError {
    NmrError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// A named experiment filled in from user parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMethod {
    /// Experiment to instantiate.
    pub template: MethodTemplate,
    /// Channel, field, spinning and dimension parameters.
    #[serde(default)]
    pub params: MethodParams,
}

/// Method of a plan, either spelled out or built from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodSpec {
    /// Built from a named experiment.
    Template(TemplateMethod),
    /// A fully specified method.
    Explicit(Method),
}

impl MethodSpec {
    /// Produces the concrete method.
    pub fn resolve(&self) -> Result<Method, NmrError> {
        match self {
            MethodSpec::Template(named) => named.template.build(&named.params),
            MethodSpec::Explicit(method) => Ok(method.clone()),
        }
    }
}

/// Everything needed to reproduce one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPlan {
    /// Spin systems summed into the spectrum.
    pub spin_systems: Vec<SpinSystem>,
    /// Measurement description.
    pub method: MethodSpec,
    /// Averaging knobs.
    #[serde(default)]
    pub config: SimulatorConfig,
}

impl SimulationPlan {
    /// Deterministic hash of the plan contents.
    pub fn plan_hash(&self) -> Result<String, NmrError> {
        stable_hash_string(self)
    }

    /// YAML representation of the plan.
    pub fn to_yaml_string(&self) -> Result<String, NmrError> {
        to_yaml_string(self)
    }

    /// Resolves the method and runs the simulation.
    pub fn run(&self, cache: &OrientationCache, cancel: &CancelToken) -> Result<SimulationOutput, NmrError> {
        let method = self.method.resolve()?;
        run(&self.spin_systems, &method, &self.config, cache, cancel)
    }
}

/// Loads a plan from a YAML file.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<SimulationPlan, NmrError> {
    let plan_path = path.as_ref();
    let bytes = fs::read(plan_path).map_err(|err| {
        io_error("plan_read", err).with_context("path", plan_path.display())
    })?;
    from_yaml_slice(&bytes)
}

/// Writes a plan as YAML.
pub fn save_plan<P: AsRef<Path>>(plan: &SimulationPlan, path: P) -> Result<(), NmrError> {
    let plan_path = path.as_ref();
    fs::write(plan_path, plan.to_yaml_string()?).map_err(|err| {
        io_error("plan_write", err).with_context("path", plan_path.display())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_methods_parse_from_yaml() {
        let yaml = r#"
spin_systems:
  - sites:
      - isotope: 13C
        isotropic_chemical_shift: 10.0
method:
  template: BlochDecaySpectrum
  params:
    channels: ["13C"]
    spectral_dimensions:
      - count: 512
        spectral_width: 20000.0
"#;
        let plan: SimulationPlan = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(plan.method, MethodSpec::Template(_)));
        let method = plan.method.resolve().unwrap();
        assert_eq!(method.channels, vec!["13C".to_string()]);
        assert_eq!(method.spectral_dimensions[0].count, 512);
        assert_eq!(plan.config, SimulatorConfig::default());
    }

    #[test]
    fn missing_file_is_a_serde_error() {
        let err = load_plan("/nonexistent/plan.yaml").unwrap_err();
        assert!(matches!(err, NmrError::Serde(_)));
        assert_eq!(err.info().code, "plan_read");
    }
}
