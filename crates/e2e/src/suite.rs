//! Built-in image registration scenarios, embedded at compile time

use crate::error::E2eResult;
use crate::scenario::Scenario;

const BUILTIN: &[(&str, &str)] = &[
    ("01_invalid_inputs.yaml", include_str!("../scenarios/01_invalid_inputs.yaml")),
    ("02_valid_inputs_enter.yaml", include_str!("../scenarios/02_valid_inputs_enter.yaml")),
    ("03_valid_inputs_click.yaml", include_str!("../scenarios/03_valid_inputs_click.yaml")),
    ("04_reload_durability.yaml", include_str!("../scenarios/04_reload_durability.yaml")),
];

/// The shipped scenarios in run order
pub fn builtin() -> E2eResult<Vec<Scenario>> {
    BUILTIN.iter().map(|(_, yaml)| Scenario::from_yaml(yaml)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_parse_and_lint_clean() {
        let scenarios = builtin().unwrap();
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["invalid-inputs", "valid-inputs-enter", "valid-inputs-click", "reload-durability"]
        );

        for scenario in &scenarios {
            assert!(scenario.lint().is_empty(), "{} has lint warnings", scenario.name);
            assert!(scenario.clear_storage_after);
        }
    }
}
