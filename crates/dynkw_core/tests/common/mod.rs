#![allow(dead_code)]

use dynkw_core::metadata::markers::{keyword_attribute, parameter_attribute, property_attribute};
use dynkw_core::metadata::{MemberRecord, ModuleMetadata, TypeRecord};
use dynkw_core::model::spec::{BodyMode, KeywordSpec, ModuleRef, UseMode};
use dynkw_core::compile::{HashtableEntry, ScriptBlock};
use dynkw_core::{
    discover_keywords, Binder, Expr, KeywordInvocation, KeywordTypeDef, SourceSpan, Statement,
    StaticModule, StaticModuleLoader, Value,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn contoso_ref() -> ModuleRef {
    ModuleRef::new(Uuid::from_u128(0xC0_17_05_00), "Contoso.Dsl", "1.2.0")
}

pub fn keyword_class(name: &str, body: BodyMode, use_mode: UseMode) -> TypeRecord {
    TypeRecord::class(name)
        .extends("Contoso.Dsl.Keyword")
        .with_attribute(keyword_attribute(body, use_mode))
}

pub fn positional(name: &str, type_name: &str, position: u32, mandatory: bool) -> MemberRecord {
    MemberRecord::property(name, type_name)
        .with_attribute(parameter_attribute(mandatory, Some(position), None))
}

/// `Widget "Box" { Part "Left" }`: a scoped block with a hook-less child.
pub fn widget_type() -> TypeRecord {
    keyword_class("Widget", BodyMode::ScriptBlock, UseMode::OptionalMany)
        .with_member(positional("Name", "System.String", 0, true))
        .with_nested(
            keyword_class("Part", BodyMode::Command, UseMode::OptionalMany)
                .with_member(positional("Label", "System.String", 0, false)),
        )
}

/// `Config { Level = 3; Mode = "Safe" }`
pub fn config_type() -> TypeRecord {
    keyword_class("Config", BodyMode::Hashtable, UseMode::OptionalMany)
        .with_nested(TypeRecord::enumeration("Mode", ["value__", "Fast", "Safe"]))
        .with_member(
            MemberRecord::property("Level", "System.Int32").with_attribute(property_attribute(true)),
        )
        .with_member(
            MemberRecord::property("Mode", "Contoso.Dsl.Config+Mode")
                .with_attribute(property_attribute(false)),
        )
        .with_member(
            MemberRecord::property("Tags", "System.String[]")
                .with_attribute(property_attribute(false)),
        )
}

/// `Cluster "c" { Node "a" { Disk 10 } }` with required nodes and at most
/// one disk per node.
pub fn cluster_type() -> TypeRecord {
    keyword_class("Cluster", BodyMode::ScriptBlock, UseMode::OptionalMany)
        .with_member(positional("Name", "System.String", 0, true))
        .with_nested(
            keyword_class("Node", BodyMode::ScriptBlock, UseMode::RequiredMany)
                .with_member(positional("Name", "System.String", 0, true))
                .with_nested(
                    keyword_class("Disk", BodyMode::Command, UseMode::Optional)
                        .with_member(positional("Size", "System.Int32", 0, true)),
                ),
        )
}

pub fn contoso_metadata() -> ModuleMetadata {
    ModuleMetadata::new(contoso_ref())
        .with_type(widget_type())
        .with_type(config_type())
        .with_type(cluster_type())
        .with_type(
            TypeRecord::class("Helper")
                .with_nested(keyword_class("Hidden", BodyMode::Command, UseMode::OptionalMany)),
        )
}

fn record(log: &CallLog, entry: String) {
    log.lock().expect("call log lock").push(entry);
}

fn text(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or("?").to_string()
}

/// In-process implementation of `contoso_metadata()`; hooks append to `log`.
pub fn contoso_module(log: &CallLog) -> StaticModule {
    let widget_enter = Arc::clone(log);
    let widget_leave = Arc::clone(log);
    let config_enter = Arc::clone(log);
    let cluster_leave = Arc::clone(log);
    let node_enter = Arc::clone(log);
    let node_leave = Arc::clone(log);
    let disk_leave = Arc::clone(log);

    StaticModule::new(contoso_ref())
        .with_type(
            KeywordTypeDef::new("Widget")
                .with_nested(KeywordTypeDef::new("Part"))
                .on_enter(move |instance, ancestors| {
                    let name = text(instance.parameter("Name"));
                    record(&widget_enter, format!("enter Widget {name} depth={}", ancestors.len()));
                    Ok(Value::String(name))
                })
                .on_leave(move |frame, _, children| {
                    record(&widget_leave, format!("leave Widget children={}", children.len()));
                    Ok(frame.entry_result.clone().unwrap_or(Value::Null))
                }),
        )
        .with_type(KeywordTypeDef::new("Config").on_enter(move |instance, _| {
            let level = instance.property("Level").cloned().unwrap_or(Value::Null);
            let mode = text(instance.property("Mode"));
            record(&config_enter, format!("enter Config level={level} mode={mode}"));
            Ok(level)
        }))
        .with_type(
            KeywordTypeDef::new("Cluster")
                .with_nested(
                    KeywordTypeDef::new("Node")
                        .with_nested(KeywordTypeDef::new("Disk").on_leave(move |frame, ancestors, _| {
                            let size = frame.instance.parameter("Size").cloned().unwrap_or(Value::Null);
                            record(&disk_leave, format!("leave Disk size={size} depth={}", ancestors.len()));
                            Ok(size)
                        }))
                        .on_enter(move |instance, ancestors| {
                            let parent = ancestors
                                .last()
                                .map(|frame| frame.instance.name().to_string())
                                .unwrap_or_default();
                            record(
                                &node_enter,
                                format!("enter Node {} parent={parent}", text(instance.parameter("Name"))),
                            );
                            Ok(Value::Null)
                        })
                        .on_leave(move |frame, _, children| {
                            let name = text(frame.instance.parameter("Name"));
                            record(&node_leave, format!("leave Node {name} children={}", children.len()));
                            Ok(Value::String(name))
                        }),
                )
                .on_leave(move |_, _, children| {
                    record(&cluster_leave, format!("leave Cluster children={}", children.len()));
                    Ok(Value::Array(children.iter().flatten().cloned().collect()))
                }),
        )
}

/// Discovers and binds the sample module; returns its forest and call log.
pub fn bound_contoso() -> (BTreeMap<String, Arc<KeywordSpec>>, CallLog) {
    let log: CallLog = Arc::default();
    let forest = discover_keywords(&contoso_metadata()).expect("sample module discovers");
    let loader = StaticModuleLoader::new().with_module(contoso_module(&log));
    let specs: Vec<Arc<KeywordSpec>> = forest.values().cloned().collect();
    Binder::new()
        .bind(&specs, &loader)
        .expect("sample module binds");
    (forest, log)
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().expect("call log lock").clone()
}

pub fn invoke(spec: &Arc<KeywordSpec>, line: u32) -> KeywordInvocation {
    KeywordInvocation::new(Arc::clone(spec), SourceSpan::line(line))
}

pub fn block(statements: Vec<Statement>) -> Expr {
    Expr::ScriptBlock(ScriptBlock::new(statements, SourceSpan::line(1)))
}

/// Hashtable literal with string keys; entry `i` sits on line `i + 2`.
pub fn table(entries: Vec<(&str, Expr)>) -> Expr {
    Expr::Hashtable(
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (key, value))| {
                HashtableEntry::new(Expr::string(key), value, SourceSpan::line(index as u32 + 2))
            })
            .collect(),
    )
}
