//! The facade must expose enough surface that downstream code never needs to
//! name the member crates directly.

use tablemap::{Entity, Identifiable, Insertable, ParamValue, Persistable};

#[derive(Entity, Clone, Debug, PartialEq)]
struct Widget {
    #[fetch(id)]
    id: String,
    label: String,
    weight: f64,
}

#[test]
fn derive_and_traits_resolve_through_the_facade() {
    assert_eq!(Widget::TABLE, "Widget");
    assert_eq!(Widget::ID_COLUMN, "id");
    let columns: Vec<&str> = Widget::FIELDS.iter().map(|f| f.column).collect();
    assert_eq!(columns, vec!["id", "label", "weight"]);

    let w = Widget {
        id: "w1".into(),
        label: "gear".into(),
        weight: 2.5,
    };
    assert_eq!(w.id(), Some("w1".to_string()));
    assert_eq!(
        w.insert_values(),
        vec![
            ParamValue::String("w1".into()),
            ParamValue::String("gear".into()),
            ParamValue::F64(2.5),
        ]
    );
}

#[cfg(feature = "sql-builder")]
#[test]
fn sql_builder_is_reachable_when_enabled() {
    assert_eq!(
        tablemap::sql::select_by_id::<Widget>(),
        "SELECT * FROM Widget WHERE id = ?"
    );
}
