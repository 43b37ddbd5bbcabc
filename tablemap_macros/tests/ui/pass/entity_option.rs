use tablemap_core::{Identifiable, Insertable, ParamValue};
use tablemap_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "articles")]
struct Article {
    #[fetch(id)]
    id: Option<i64>,
    title: String,
    subtitle: Option<String>,
}

fn main() {
    // Identifiable::Key unwraps the Option; id() returns it when set.
    let a = Article {
        id: Some(5),
        title: "t".into(),
        subtitle: None,
    };
    let id: Option<<Article as Identifiable>::Key> = a.id();
    assert_eq!(id, Some(5));

    // Unset optional fields bind as NULL, in declaration order.
    let values = a.insert_values();
    assert_eq!(values.len(), 3);
    assert!(matches!(values[0], ParamValue::I64(5)));
    assert!(matches!(values[2], ParamValue::Null));
}
