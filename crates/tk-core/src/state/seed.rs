//! Demo data for a fresh table

use crate::model::Row;

const DEMO_PEOPLE: [(&str, i64, &str); 20] = [
    ("Alice", 22, "Admin"),
    ("Bob", 30, "User"),
    ("Charlie", 27, "User"),
    ("Diana", 24, "Owner"),
    ("Evan", 21, "User"),
    ("Faith", 29, "Admin"),
    ("George", 26, "User"),
    ("Helen", 25, "User"),
    ("Ivan", 33, "Owner"),
    ("Jane", 32, "User"),
    ("Karl", 28, "Admin"),
    ("Linda", 23, "User"),
    ("Mark", 31, "User"),
    ("Nina", 27, "Owner"),
    ("Oscar", 22, "User"),
    ("Paula", 30, "Admin"),
    ("Quinn", 30, "User"),
    ("Rita", 28, "User"),
    ("Steve", 25, "Admin"),
    ("Tina", 24, "User"),
];

/// Twenty demo people keyed by the standard columns
pub fn demo_rows() -> Vec<Row> {
    DEMO_PEOPLE
        .iter()
        .map(|&(name, age, role)| {
            let mut row = Row::new();
            row.insert("name", name);
            row.insert("email", format!("{}@example.com", name.to_lowercase()));
            row.insert("age", age);
            row.insert("role", role);
            row
        })
        .collect()
}
