mod common;

use common::{config_type, contoso_metadata, contoso_ref, keyword_class, positional, widget_type};
use dynkw_core::metadata::markers::{
    keyword_attribute, parameter_attribute, property_attribute,
};
use dynkw_core::metadata::AttributeRecord;
use dynkw_core::metadata::{MemberRecord, ModuleMetadata, TypeRecord};
use dynkw_core::model::spec::{BodyMode, UseMode, ALL_PARAMETER_SETS};
use dynkw_core::{discover_keywords, DiscoveryError};

#[test]
fn discovers_top_level_keywords_with_nesting_and_body_modes() {
    let forest = discover_keywords(&contoso_metadata()).expect("discovery succeeds");

    assert_eq!(
        forest.keys().cloned().collect::<Vec<_>>(),
        vec!["Cluster", "Config", "Widget"]
    );
    let widget = &forest["Widget"];
    assert_eq!(widget.body_mode, BodyMode::ScriptBlock);
    assert!(!widget.is_nested);
    assert_eq!(widget.source_module, contoso_ref());

    let part = widget.child("part").expect("Part is nested under Widget");
    assert!(part.is_nested);
    assert_eq!(part.body_mode, BodyMode::Command);

    let node = forest["Cluster"].child("Node").expect("Node child");
    assert_eq!(node.use_mode, UseMode::RequiredMany);
    let disk = node.child("Disk").expect("Disk grandchild");
    assert_eq!(disk.use_mode, UseMode::Optional);
    assert_eq!(disk.parameters[0].type_name, "int");
}

#[test]
fn keyword_types_inside_plain_classes_are_ignored() {
    let forest = discover_keywords(&contoso_metadata()).expect("discovery succeeds");
    assert!(!forest.contains_key("Hidden"));
    assert!(!forest.contains_key("Helper"));
}

#[test]
fn duplicate_sibling_name_fails_the_whole_module() {
    let metadata = contoso_metadata().with_type(keyword_class(
        "Widget",
        BodyMode::Command,
        UseMode::OptionalMany,
    ));
    let err = discover_keywords(&metadata).expect_err("duplicate top-level name");
    assert!(matches!(
        err,
        DiscoveryError::DuplicateKeyword { ref name, .. } if name == "Widget"
    ));

    let nested_clash = ModuleMetadata::new(contoso_ref()).with_type(
        keyword_class("Panel", BodyMode::ScriptBlock, UseMode::OptionalMany)
            .with_nested(keyword_class("Slot", BodyMode::Command, UseMode::OptionalMany))
            .with_nested(keyword_class("slot", BodyMode::Command, UseMode::Optional)),
    );
    let err = discover_keywords(&nested_clash).expect_err("duplicate nested name");
    assert!(matches!(
        err,
        DiscoveryError::DuplicateKeyword { ref scope, .. } if scope == "Panel"
    ));
}

#[test]
fn top_level_keywords_must_be_optional_many() {
    for use_mode in [UseMode::Optional, UseMode::Required, UseMode::RequiredMany] {
        let metadata = ModuleMetadata::new(contoso_ref())
            .with_type(widget_type())
            .with_type(keyword_class("Strict", BodyMode::Command, use_mode));
        let err = discover_keywords(&metadata).expect_err("restricted use mode at top level");
        assert!(matches!(err, DiscoveryError::InvalidUseMode { .. }));
    }

    let metadata = ModuleMetadata::new(contoso_ref()).with_type(keyword_class(
        "Strict",
        BodyMode::Command,
        UseMode::OptionalMany,
    ));
    assert_eq!(discover_keywords(&metadata).expect("OptionalMany is fine").len(), 1);
}

#[test]
fn nested_keyword_under_command_parent_fails() {
    let metadata = ModuleMetadata::new(contoso_ref()).with_type(
        keyword_class("Flat", BodyMode::Command, UseMode::OptionalMany)
            .with_nested(keyword_class("Inner", BodyMode::Command, UseMode::OptionalMany)),
    );
    let err = discover_keywords(&metadata).expect_err("children under command body");
    assert_eq!(
        err,
        DiscoveryError::NestedUnderCommand {
            parent: "Flat".to_string(),
            child: "Inner".to_string(),
        }
    );
}

#[test]
fn enum_typed_members_resolve_from_enclosing_scopes() {
    let metadata = ModuleMetadata::new(contoso_ref())
        .with_type(TypeRecord::enumeration("Ensure", ["value__", "Present", "Absent"]))
        .with_type(config_type())
        .with_type(
            keyword_class("Package", BodyMode::Command, UseMode::OptionalMany)
                .with_member(positional("Ensure", "Contoso.Dsl.Ensure", 0, false)),
        );
    let forest = discover_keywords(&metadata).expect("discovery succeeds");

    let mode = forest["Config"].property("Mode").expect("Mode property");
    assert_eq!(
        mode.enum_values.iter().cloned().collect::<Vec<_>>(),
        vec!["Fast", "Safe"]
    );
    let level = forest["Config"].property("Level").expect("Level property");
    assert!(level.mandatory);
    assert!(level.enum_values.is_empty());

    let ensure = forest["Package"].parameter("Ensure").expect("Ensure parameter");
    assert!(ensure.enum_values.contains("Present"));
    assert!(!ensure.enum_values.contains("value__"));
}

#[test]
fn parameters_carry_one_entry_per_parameter_set() {
    let metadata = ModuleMetadata::new(contoso_ref()).with_type(
        keyword_class("Service", BodyMode::Command, UseMode::OptionalMany)
            .with_member(
                MemberRecord::property("Name", "System.String")
                    .with_attribute(parameter_attribute(true, Some(0), Some("ByName")))
                    .with_attribute(parameter_attribute(false, None, Some("ById"))),
            )
            .with_member(
                MemberRecord::property("Force", "System.Management.Automation.SwitchParameter")
                    .with_attribute(parameter_attribute(false, None, None)),
            )
            .with_member(MemberRecord::property("Ignored", "System.String"))
            .with_member(
                MemberRecord::property("Computed", "System.String")
                    .read_only()
                    .with_attribute(parameter_attribute(false, None, None)),
            ),
    );
    let forest = discover_keywords(&metadata).expect("discovery succeeds");
    let service = &forest["Service"];

    assert_eq!(service.parameters.len(), 2);
    let name = service.parameter("Name").expect("Name parameter");
    assert_eq!(name.parameter_sets.len(), 2);
    assert_eq!(name.in_set("ByName").and_then(|data| data.position), Some(0));
    assert_eq!(name.in_set("ById").map(|data| data.mandatory), Some(false));

    let force = service.parameter("Force").expect("Force parameter");
    assert_eq!(force.type_name, "switch");
    assert!(force.parameter_sets.contains_key(ALL_PARAMETER_SETS));
    assert!(force.in_set("ByName").is_some());
    assert_eq!(service.parameter_set_names(), vec!["ById", "ByName"]);
}

#[test]
fn duplicate_positions_and_invalid_names_fail() {
    let clashing = ModuleMetadata::new(contoso_ref()).with_type(
        keyword_class("Copy", BodyMode::Command, UseMode::OptionalMany)
            .with_member(positional("Source", "System.String", 0, true))
            .with_member(positional("Target", "System.String", 0, true)),
    );
    let err = discover_keywords(&clashing).expect_err("two parameters at position 0");
    assert!(matches!(
        err,
        DiscoveryError::DuplicatePosition { position: 0, .. }
    ));

    let badly_named = ModuleMetadata::new(contoso_ref()).with_type(keyword_class(
        "Not-A-Name",
        BodyMode::Command,
        UseMode::OptionalMany,
    ));
    let err = discover_keywords(&badly_named).expect_err("invalid keyword name");
    assert_eq!(err, DiscoveryError::InvalidKeywordName("Not-A-Name".to_string()));
}

#[test]
fn all_sets_positions_count_toward_every_named_set() {
    let clashing = ModuleMetadata::new(contoso_ref()).with_type(
        keyword_class("Svc", BodyMode::Command, UseMode::OptionalMany)
            .with_member(positional("Name", "System.String", 0, false))
            .with_member(
                MemberRecord::property("Id", "System.Int32")
                    .with_attribute(parameter_attribute(true, Some(0), Some("ById"))),
            ),
    );
    let err = discover_keywords(&clashing).expect_err("Name and Id share position 0 in ById");
    assert_eq!(
        err,
        DiscoveryError::DuplicatePosition {
            keyword: "Svc".to_string(),
            parameter_set: "ById".to_string(),
            position: 0,
        }
    );
}

fn namespaced(attribute: AttributeRecord) -> AttributeRecord {
    AttributeRecord {
        name: format!("Contoso.Dsl.{}", attribute.name),
        ..attribute
    }
}

#[test]
fn namespaced_marker_attributes_are_recognized() {
    let metadata = ModuleMetadata::new(contoso_ref())
        .with_type(
            TypeRecord::class("Deploy")
                .extends("Contoso.Dsl.Keyword")
                .with_attribute(namespaced(keyword_attribute(
                    BodyMode::Command,
                    UseMode::OptionalMany,
                )))
                .with_member(
                    MemberRecord::property("Target", "System.String")
                        .with_attribute(namespaced(parameter_attribute(true, Some(0), None))),
                ),
        )
        .with_type(
            TypeRecord::class("Settings")
                .extends("Contoso.Dsl.Keyword")
                .with_attribute(namespaced(keyword_attribute(
                    BodyMode::Hashtable,
                    UseMode::OptionalMany,
                )))
                .with_member(
                    MemberRecord::property("Level", "System.Int32")
                        .with_attribute(namespaced(property_attribute(true))),
                ),
        );

    let forest = discover_keywords(&metadata).expect("namespaced markers discover");
    assert_eq!(forest.len(), 2);
    let target = forest["Deploy"].parameter("Target").expect("Target parameter");
    assert_eq!(target.in_set(ALL_PARAMETER_SETS).and_then(|data| data.position), Some(0));
    let level = forest["Settings"].property("Level").expect("Level property");
    assert!(level.mandatory);
}

#[test]
fn spec_forest_serializes_without_runtime_info() {
    let forest = discover_keywords(&contoso_metadata()).expect("discovery succeeds");
    let json = serde_json::to_value(forest["Widget"].as_ref()).expect("spec serializes");

    assert_eq!(json["name"], "Widget");
    assert_eq!(json["body_mode"], "ScriptBlock");
    assert_eq!(json["children"][0]["name"], "Part");
    assert!(json.get("runtime").is_none());
}
