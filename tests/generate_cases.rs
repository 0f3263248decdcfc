//! End-to-end generation of every bundled case into a temporary directory.

use std::fs;

use femgen::cases::{self, bending_beam, block_torsion, hertzian_contact};

#[test]
fn bending_beam_writes_dat_and_readme() {
    let dir = tempfile::tempdir().expect("temp dir");
    let generated = bending_beam::write(&bending_beam::Params::default(), dir.path())
        .expect("case generates");

    assert_eq!(
        generated.deck,
        dir.path().join("hyperelastic_bending_beam.dat")
    );
    let deck = fs::read_to_string(&generated.deck).expect("deck readable");
    assert!(deck.contains("PROBLEMTYPE"));
    assert!(deck.contains("DESIGN LINE DIRICH CONDITIONS"));
    assert!(deck.contains("DESIGN LINE NEUMANN CONDITIONS"));
    assert!(deck.contains("NUMDOF 2 ONOFF 0 1 VAL 0 -10000000 FUNCT 0 1"));
    assert!(deck.contains("DLINE-NODE TOPOLOGY"));
    assert!(deck.contains("NODE 1 COORD"));
    assert!(deck.contains("WALL QUAD4"));
    assert!(deck.contains("KINEM nonlinear EAS none THICK 1 STRESS_STRAIN plane_strain GP 2 2"));

    // 201 x 21 node grid over the default 20 x 2 rectangle at size 0.1.
    let coord_lines = deck
        .lines()
        .filter(|line| line.starts_with("NODE") && line.contains("COORD"))
        .count();
    assert_eq!(coord_lines, 201 * 21);

    let readme = fs::read_to_string(&generated.readme).expect("readme readable");
    assert!(readme.starts_with("# Hyperelastic bending beam"));
    assert!(readme.contains("| Parameter | Value |"));
    assert!(readme.contains("| load_steps | 50 |"));
    assert!(readme.contains("Last updated: "));
}

#[test]
fn block_torsion_writes_into_a_kinematics_subdir() {
    let dir = tempfile::tempdir().expect("temp dir");
    let generated = block_torsion::write(&block_torsion::Params::default(), dir.path())
        .expect("case generates");

    assert_eq!(
        generated.deck,
        dir.path().join("nonlinear").join("block_torsion.dat")
    );
    let deck = fs::read_to_string(&generated.deck).expect("deck readable");
    assert!(deck.contains("DIM"));
    assert!(deck.contains("DESIGN SURF DIRICH CONDITIONS"));
    assert!(deck.contains("DSURF-NODE TOPOLOGY"));
    assert!(deck.contains("SOLID HEX8"));
    assert!(deck.contains("ONOFF 1 1 1 VAL 0 1 1 FUNCT 0 1 2"));
    assert!(deck.contains("FUNCT2"));

    let element_lines = deck
        .lines()
        .filter(|line| line.contains("SOLID HEX8"))
        .count();
    assert_eq!(element_lines, 40 * 10 * 10);

    let readme = fs::read_to_string(&generated.readme).expect("readme readable");
    assert!(readme.contains("| end_rotation | 150 |"));
}

#[test]
fn hertzian_contact_writes_a_parseable_yaml_deck() {
    let dir = tempfile::tempdir().expect("temp dir");
    let generated = hertzian_contact::write(&hertzian_contact::Params::default(), dir.path())
        .expect("case generates");

    assert_eq!(
        generated.deck,
        dir.path().join("nonlinear").join("hertzian_contact.yaml")
    );
    let raw = fs::read_to_string(&generated.deck).expect("deck readable");
    let deck: serde_yaml::Value = serde_yaml::from_str(&raw).expect("well-formed YAML");

    let contact = deck
        .get("DESIGN LINE SOLID TO SOLID CONTACT CONDITIONS")
        .and_then(serde_yaml::Value::as_sequence)
        .expect("contact condition present");
    assert_eq!(contact.len(), 1);
    assert_eq!(
        contact[0].get("Side").and_then(serde_yaml::Value::as_str),
        Some("Slave")
    );

    let neumann = deck
        .get("DESIGN LINE NEUMANN CONDITIONS")
        .and_then(serde_yaml::Value::as_sequence)
        .expect("pressure condition present");
    assert_eq!(
        neumann[0]
            .get("VAL")
            .and_then(serde_yaml::Value::as_sequence)
            .map(Vec::len),
        Some(2)
    );

    assert!(deck.get("NODE COORDS").is_some());
    let elements = deck
        .get("STRUCTURE ELEMENTS")
        .and_then(serde_yaml::Value::as_sequence)
        .expect("elements present");
    assert!(!elements.is_empty());

    let readme = fs::read_to_string(&generated.readme).expect("readme readable");
    assert!(readme.contains("| end_pressure | 5 |"));
    assert!(readme.contains("| mesh_size_contact | 0.02 |"));
}

#[test]
fn write_all_generates_every_case() {
    let dir = tempfile::tempdir().expect("temp dir");
    let generated = cases::write_all(dir.path()).expect("all cases generate");
    assert_eq!(generated.len(), 3);
    for case in &generated {
        assert!(case.deck.is_file(), "missing deck {}", case.deck.display());
        assert!(
            case.readme.is_file(),
            "missing readme {}",
            case.readme.display()
        );
    }
}
