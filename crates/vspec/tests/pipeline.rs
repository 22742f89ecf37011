//! End-to-end pipeline scenarios: load, overlay, expand, validate
//!
//! Each test writes a small vspec universe into a temp directory and runs
//! the full compile pipeline over it.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use vspec::pipeline::{CompileOptions, Compiled, compile};
use vspec::CompileError;
use vspec_model::NodeKind;

const UNITS: &str = r#"
units:
  km:
    label: km
    description: Kilometers
    quantity: distance
    allowed_datatypes: [numeric]
  km/h:
    label: km/h
    description: Kilometers per hour
    quantity: speed
    allowed_datatypes: [numeric]
"#;

const QUANTITIES: &str = r#"
quantities:
  distance:
    description: Distance
  speed:
    description: Speed
"#;

struct Fixture {
    dir: TempDir,
    options: CompileOptions,
}

impl Fixture {
    fn new(vspec: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let mut fixture = Self {
            options: CompileOptions::default(),
            dir,
        };
        fixture.options.vspec = fixture.write("main.vspec", vspec);
        fixture.options.unit_files = vec![fixture.write("units.yaml", UNITS)];
        fixture.options.quantity_files = vec![fixture.write("quantities.yaml", QUANTITIES)];
        fixture
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn overlay(mut self, name: &str, content: &str) -> Self {
        let path = self.write(name, content);
        self.options.overlays.push(path);
        self
    }

    fn no_expand(mut self) -> Self {
        self.options.no_expand = true;
        self
    }

    fn compile(&self) -> Result<Compiled, CompileError> {
        compile(&self.options)
    }
}

const INSTANCE_BASE: &str = r#"
A:
  type: branch
  description: Root
A.B:
  type: branch
  description: B
  instances: [[X, Y]]
A.B.S:
  type: sensor
  datatype: int8
  unit: km
  description: S
"#;

#[test]
fn s1_instance_expansion() {
    let compiled = Fixture::new(INSTANCE_BASE).compile().unwrap();
    let tree = &compiled.tree;
    let x_s = tree.find("A.B.X.S").expect("A.B.X.S exists");
    let y_s = tree.find("A.B.Y.S").expect("A.B.Y.S exists");
    assert_eq!(x_s.description.as_deref(), Some("S"));
    assert_eq!(y_s.description.as_deref(), Some("S"));
    // The template child is gone as a direct leaf.
    assert!(tree.find("A.B.S").is_none());
}

#[test]
fn s2_overlay_on_instance_in_no_expand_mode() {
    let compiled = Fixture::new(INSTANCE_BASE)
        .overlay(
            "single.vspec",
            r#"
A.B.X.S:
  type: sensor
  datatype: float
  unit: km
  description: overridden
"#,
        )
        .no_expand()
        .compile()
        .unwrap();
    let tree = &compiled.tree;

    // The template still carries its descriptor.
    let b = tree.find("A.B").unwrap();
    let instances = b.instances().expect("instances preserved");
    assert_eq!(instances.dims.len(), 1);
    assert_eq!(instances.dims[0].labels.len(), 2);

    let x_s = tree.find("A.B.X.S").expect("overridden leaf exists");
    assert_eq!(
        x_s.signal().unwrap().datatype.as_ref().unwrap().canonical(),
        "float"
    );
    assert_eq!(x_s.description.as_deref(), Some("overridden"));
    // Y was never materialized.
    assert!(tree.find("A.B.Y.S").is_none());
}

#[test]
fn s2_overlay_on_instance_with_expansion() {
    let compiled = Fixture::new(INSTANCE_BASE)
        .overlay(
            "single.vspec",
            r#"
A.B.X.S:
  type: sensor
  datatype: float
  unit: km
  description: overridden
"#,
        )
        .compile()
        .unwrap();
    let tree = &compiled.tree;
    // Expanded FQN data beats the template, per instance.
    assert_eq!(
        tree.find("A.B.X.S").unwrap().signal().unwrap().datatype.as_ref().unwrap().canonical(),
        "float"
    );
    assert_eq!(
        tree.find("A.B.Y.S").unwrap().signal().unwrap().datatype.as_ref().unwrap().canonical(),
        "int8"
    );
}

#[test]
fn s3_delete_subtree() {
    let base = r#"
Vehicle:
  type: branch
  description: Root
Vehicle.Cabin:
  type: branch
  description: Cabin
Vehicle.Cabin.Row1:
  type: branch
  description: Front row
Vehicle.Cabin.Row1.Temp:
  type: sensor
  datatype: int8
  description: Temp
Vehicle.Cabin.Row2:
  type: branch
  description: Rear row
Vehicle.Cabin.Row2.Temp:
  type: sensor
  datatype: int8
  description: Temp
"#;
    let compiled = Fixture::new(base)
        .overlay(
            "delete.vspec",
            "Vehicle.Cabin.Row2:\n  type: branch\n  delete: true\n",
        )
        .compile()
        .unwrap();
    let tree = &compiled.tree;
    assert!(tree.find("Vehicle.Cabin.Row1.Temp").is_some());
    assert!(tree.find("Vehicle.Cabin.Row2").is_none());
    assert!(tree.find("Vehicle.Cabin.Row2.Temp").is_none());
}

#[test]
fn overlay_idempotence() {
    let overlay = r#"
A.B.S:
  type: sensor
  datatype: float
  unit: km/h
  description: changed
"#;
    let once = Fixture::new(INSTANCE_BASE)
        .overlay("o1.vspec", overlay)
        .compile()
        .unwrap();
    let twice = Fixture::new(INSTANCE_BASE)
        .overlay("o1.vspec", overlay)
        .overlay("o2.vspec", overlay)
        .compile()
        .unwrap();
    assert_eq!(once.tree, twice.tree);
}

#[test]
fn overlay_order_sensitivity() {
    let first = "A.B.S:\n  type: sensor\n  datatype: int8\n  unit: km\n  description: first\n";
    let second = "A.B.S:\n  type: sensor\n  datatype: int8\n  unit: km\n  description: second\n";

    let forward = Fixture::new(INSTANCE_BASE)
        .overlay("first.vspec", first)
        .overlay("second.vspec", second)
        .compile()
        .unwrap();
    assert_eq!(
        forward.tree.find("A.B.X.S").unwrap().description.as_deref(),
        Some("second")
    );

    let reversed = Fixture::new(INSTANCE_BASE)
        .overlay("second.vspec", second)
        .overlay("first.vspec", first)
        .compile()
        .unwrap();
    assert_eq!(
        reversed.tree.find("A.B.X.S").unwrap().description.as_deref(),
        Some("first")
    );
}

#[test]
fn expansion_combinatorics() {
    let base = r#"
Vehicle:
  type: branch
  description: Root
Vehicle.Door:
  type: branch
  description: Doors
  instances: ["Row[1,3]", [Left, Right]]
Vehicle.Door.IsOpen:
  type: sensor
  datatype: boolean
  description: Open state
Vehicle.Door.IsLocked:
  type: actuator
  datatype: boolean
  description: Lock state
"#;
    let compiled = Fixture::new(base).compile().unwrap();
    let mut leaf_fqns: Vec<String> = compiled
        .tree
        .preorder()
        .filter(|(_, _, node)| !node.kind().is_grouping())
        .map(|(fqn, _, _)| fqn)
        .collect();
    // 3 x 2 chains, two signals each.
    assert_eq!(leaf_fqns.len(), 12);
    leaf_fqns.sort();
    leaf_fqns.dedup();
    assert_eq!(leaf_fqns.len(), 12, "every expanded FQN is unique");
    assert!(leaf_fqns.contains(&"Vehicle.Door.Row3.Right.IsLocked".to_string()));
}

#[test]
fn load_then_dump_round_trip() {
    use std::path::Path;
    use vspec::export::{Exporter, ExporterContext, yaml::YamlExporter};

    let fixture = Fixture::new(INSTANCE_BASE);
    let compiled = fixture.compile().unwrap();
    let context = ExporterContext::from_compiled(&compiled);
    let dumped = YamlExporter
        .export(&context, Path::new("dump.vspec"))
        .unwrap();
    let text = String::from_utf8(dumped[0].bytes.clone()).unwrap();

    // Reload the dump and dump again: a fixed point.
    let refixture = Fixture::new(&text);
    let recompiled = refixture.compile().unwrap();
    let recontext = ExporterContext::from_compiled(&recompiled);
    let redumped = YamlExporter
        .export(&recontext, Path::new("dump.vspec"))
        .unwrap();
    assert_eq!(dumped[0].bytes, redumped[0].bytes);
}

#[test]
fn include_directive_end_to_end() {
    let fixture = Fixture::new(
        "Vehicle:\n  type: branch\n  description: Root\n#include cabin.vspec Vehicle\n",
    );
    fixture.write(
        "cabin.vspec",
        "Cabin:\n  type: branch\n  description: Cabin\nCabin.Temp:\n  type: sensor\n  datatype: int8\n  description: Temp\n",
    );
    let compiled = fixture.compile().unwrap();
    assert!(compiled.tree.find("Vehicle.Cabin.Temp").is_some());
}

#[test]
fn strict_mode_promotes_naming_warnings() {
    let base = r#"
Vehicle:
  type: branch
  description: Root
Vehicle.speed:
  type: sensor
  datatype: float
  unit: km/h
  description: lower-case name
"#;
    let mut fixture = Fixture::new(base);
    assert!(fixture.compile().is_ok());

    fixture.options.strict = true;
    match fixture.compile() {
        Err(CompileError::ValidationFailed { report }) => {
            assert!(report.has_errors());
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_unit_fails_validation() {
    let base = r#"
Vehicle:
  type: branch
  description: Root
Vehicle.Speed:
  type: sensor
  datatype: float
  unit: furlongs/fortnight
  description: Speed
"#;
    assert!(matches!(
        Fixture::new(base).compile(),
        Err(CompileError::ValidationFailed { .. })
    ));
}

#[test]
fn struct_types_resolve_end_to_end() {
    let base = r#"
Vehicle:
  type: branch
  description: Root
Vehicle.Delivery:
  type: sensor
  datatype: VehicleTypes.DeliveryInfo
  description: Delivery
"#;
    let types = r#"
VehicleTypes:
  type: branch
  description: Types root
VehicleTypes.DeliveryInfo:
  type: struct
  description: Delivery info
VehicleTypes.DeliveryInfo.Address:
  type: property
  datatype: string
  description: Address
"#;
    let mut fixture = Fixture::new(base);
    fixture.options.type_files = vec![fixture.write("types.vspec", types)];
    let compiled = fixture.compile().unwrap();
    assert!(compiled.types.contains("VehicleTypes.DeliveryInfo"));
    assert_eq!(
        compiled
            .types
            .get("VehicleTypes.DeliveryInfo")
            .unwrap()
            .properties
            .len(),
        1
    );

    // An unknown struct reference fails.
    let broken = Fixture::new(base);
    assert!(matches!(
        broken.compile(),
        Err(CompileError::ValidationFailed { .. })
    ));
}

#[test]
fn instances_survive_overlays_that_add_signals() {
    let compiled = Fixture::new(INSTANCE_BASE)
        .overlay(
            "add.vspec",
            "A.B.T:\n  type: sensor\n  datatype: int8\n  unit: km\n  description: T\n",
        )
        .compile()
        .unwrap();
    // The added template child expands like the original one.
    for path in ["A.B.X.S", "A.B.Y.S", "A.B.X.T", "A.B.Y.T"] {
        assert!(compiled.tree.find(path).is_some(), "missing {}", path);
    }
}

#[test]
fn missing_ancestor_outside_templates_fails() {
    let base = r#"
Vehicle:
  type: branch
  description: Root
Vehicle.Cabin.Temp:
  type: sensor
  datatype: int8
  description: No Cabin declared
"#;
    assert!(matches!(
        Fixture::new(base).compile(),
        Err(CompileError::MissingAncestor { .. })
    ));
}

#[test]
fn expanded_trees_only_have_grouping_parents() {
    let compiled = Fixture::new(INSTANCE_BASE).compile().unwrap();
    fn check(node: &vspec_model::Node) {
        if !node.children.is_empty() {
            assert!(matches!(node.kind(), NodeKind::Branch | NodeKind::Struct));
        }
        node.children.iter().for_each(check);
    }
    check(&compiled.tree);
}
