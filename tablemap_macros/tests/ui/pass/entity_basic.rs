use tablemap_core::{Identifiable, Insertable, Persistable};
use tablemap_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Article {
    #[fetch(id)]
    id: String,
    title: String,
    #[fetch(column = "view_count")]
    views: i64,
    #[fetch(skip)]
    draft_note: Option<String>,
}

fn main() {
    // Table name is the struct's simple name, verbatim.
    assert_eq!(Article::TABLE, "Article");
    let columns: Vec<&str> = Article::FIELDS.iter().map(|f| f.column).collect();
    assert_eq!(columns, vec!["id", "title", "view_count"]);
    assert_eq!(Article::FIELDS[0].sql_type, "TEXT");
    assert!(Article::FIELDS[0].is_id);
    assert_eq!(Article::FIELDS[2].sql_type, "INTEGER");

    // The primary key participates in inserts.
    assert_eq!(Article::INSERT_COLUMNS, &["id", "title", "view_count"]);

    let a = Article {
        id: "a1".into(),
        title: "t".into(),
        views: 3,
        draft_note: None,
    };
    assert_eq!(a.id(), Some("a1".to_string()));
    assert_eq!(a.insert_values().len(), 3);

    let _adapter = ArticleRowAdapter;
}
