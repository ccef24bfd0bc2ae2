use phf::{Map, phf_map};

/// Particles star file written by the data preparation protocol into its extra directory.
pub const OUT_SUBTOMOS_STAR: &str = "particles.star";
/// Tomograms star file written by the data preparation protocol into its extra directory.
pub const OUT_TOMOS_STAR: &str = "tomograms.star";

pub const MRC_EXTENSIONS: [&str; 2] = ["mrc", "map"];

/// Approximate angular sampling (degrees) for each HEALPix order accepted by `--healpix_order`.
pub const ANGULAR_SAMPLING_LIST: &[&str] = &[
    "30", "15", "7.5", "3.7", "1.8", "0.9", "0.5", "0.2", "0.1",
];

/// Symmetry notations in the order they are presented to users.
pub const SYMMETRY_NOTATIONS: &[&str] = &[
    "C1", "Cn", "Ci", "Cs", "Cnv", "Cnh", "Sn", "Dn", "Dnv", "Dnh", "T", "Td", "Th", "O", "Oh",
    "In", "Inh",
];

static SYMMETRY_LABELS: Map<&'static str, &'static str> = phf_map! {
    "C1" => "Asymmetric",
    "Cn" => "Cyclic",
    "Ci" => "Inversion center",
    "Cs" => "Mirror plane",
    "Cnv" => "Cyclic with vertical mirrors",
    "Cnh" => "Cyclic with horizontal mirror",
    "Sn" => "Rotoreflection",
    "Dn" => "Dihedral",
    "Dnv" => "Dihedral with vertical mirrors",
    "Dnh" => "Dihedral with horizontal mirror",
    "T" => "Tetrahedral",
    "Td" => "Tetrahedral with diagonal mirrors",
    "Th" => "Tetrahedral with horizontal mirrors",
    "O" => "Octahedral",
    "Oh" => "Octahedral with mirrors",
    "In" => "Icosahedral (n = 1..5 selects the orientation convention)",
    "Inh" => "Icosahedral with mirrors (n = 1..5)",
};

/// Maps a concrete symmetry group such as `D7` or `I3h` onto its notation family
/// (`Dn`, `Inh`) and returns the family's label.
pub fn symmetry_label(group: &str) -> Option<&'static str> {
    if let Some(label) = SYMMETRY_LABELS.get(group) {
        return Some(*label);
    }
    let mut family = String::with_capacity(group.len());
    let mut in_digits = false;
    for c in group.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                family.push('n');
                in_digits = true;
            }
        } else {
            family.push(c);
            in_digits = false;
        }
    }
    SYMMETRY_LABELS.get(family.as_str()).copied()
}

/// Renders the symmetry table used in the help text of the symmetry option.
pub fn symmetry_table() -> String {
    SYMMETRY_NOTATIONS
        .iter()
        .filter_map(|notation| {
            SYMMETRY_LABELS
                .get(*notation)
                .map(|label| format!("  {:<4} {}", notation, label))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_groups_resolve_to_their_family() {
        assert_eq!(symmetry_label("C1"), Some("Asymmetric"));
        assert_eq!(symmetry_label("C12"), Some("Cyclic"));
        assert_eq!(symmetry_label("D7"), Some("Dihedral"));
        assert_eq!(symmetry_label("I3h"), Some("Icosahedral with mirrors (n = 1..5)"));
        assert_eq!(symmetry_label("Oh"), Some("Octahedral with mirrors"));
    }

    #[test]
    fn unknown_groups_have_no_label() {
        assert_eq!(symmetry_label("X3"), None);
        assert_eq!(symmetry_label(""), None);
    }

    #[test]
    fn table_lists_every_notation_in_order() {
        let table = symmetry_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), SYMMETRY_NOTATIONS.len());
        assert!(lines[0].trim_start().starts_with("C1"));
        assert!(lines.last().unwrap().trim_start().starts_with("Inh"));
    }

    #[test]
    fn default_healpix_order_is_seven_and_a_half_degrees() {
        assert_eq!(ANGULAR_SAMPLING_LIST[2], "7.5");
    }
}
