use std::fs;

use pretty_assertions::assert_eq;

use merino::*;

mod test_plan;

fn run_plan(yarn_path: &str) -> test_plan::PlanRunner {
    let mut runner = test_plan::PlanRunner::new(yarn_path);
    runner.run().unwrap();
    runner
}

#[test]
fn test_commands() {
    run_plan("test_files/Commands.yarn");
}

#[test]
fn test_format_functions() {
    run_plan("test_files/FormatFunctions.yarn");
}

#[test]
fn test_functions() {
    let mut runner = test_plan::PlanRunner::new("test_files/Functions.yarn");
    runner.session.library.insert(
        "add_three_operands".to_string(),
        FunctionInfo::new_returning(3, |_session: &DialogueSession, parameters: &[YarnValue]| {
            let res = parameters[0].add(&parameters[1]).ok_or("cannot add")?;
            res.add(&parameters[2]).ok_or_else(|| "cannot add".to_string())
        }),
    );
    runner.session.library.insert(
        "last_value".to_string(),
        FunctionInfo::new_returning(-1, |_session: &DialogueSession, parameters: &[YarnValue]| {
            Ok(parameters.last().cloned().unwrap_or(YarnValue::Null))
        }),
    );
    runner.run().unwrap();
}

#[test]
fn test_if_statements() {
    run_plan("test_files/IfStatements.yarn");
}

#[test]
fn test_inline_expressions() {
    run_plan("test_files/InlineExpressions.yarn");
}

#[test]
fn test_links_and_visits() {
    let runner = run_plan("test_files/Links.yarn");
    assert_eq!(runner.session.visit_count("Start"), 2);
    assert_eq!(runner.session.visit_count("Shop"), 1);
    assert_eq!(runner.session.visit_count("End"), 1);
}

#[test]
fn test_shortcut_options() {
    run_plan("test_files/ShortcutOptions.yarn");
}

#[test]
fn test_variable_storage() {
    let runner = run_plan("test_files/VariableStorage.yarn");
    let variables = &runner.session.variable_storage;

    assert_eq!(variables.try_get_value::<f32>("$gold").unwrap(), Some(15.0));
    assert_eq!(variables.try_get_value::<bool>("$met_guard").unwrap(), Some(true));
    assert_eq!(variables.try_get_value::<String>("$name").unwrap(), Some("Ada".to_string()));
    assert!(!variables.contains("$cleared"));
    assert!(matches!(
        variables.try_get_value::<bool>("$gold"),
        Err(Error::TypeMismatch { .. })
    ));

    let text = variables.serialize_to_text().unwrap();
    let mut restored = VariableStore::new();
    restored.deserialize_from_text(&text).unwrap();
    assert_eq!(&restored, variables);
}

#[test]
fn test_reformat_is_stable() {
    let text = fs::read_to_string("test_files/Links.yarn").unwrap();
    let nodes = codec::parse(&text).unwrap();

    let written = codec::serialize(&nodes, &CodecConfig::default());
    assert_eq!(codec::parse(&written).unwrap(), nodes);
    assert_eq!(codec::serialize(&codec::parse(&written).unwrap(), &CodecConfig::default()), written);
}
