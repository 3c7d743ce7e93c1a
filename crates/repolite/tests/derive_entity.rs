#![cfg(feature = "derive")]

use repolite::prelude::*;
use repolite::{ColumnDef, SqlDbType, ValueType};

#[derive(Debug, Default, PartialEq, Entity)]
#[orm(name = "Doc", schema = "archive", table = "Documents")]
struct Document {
    #[orm(id, identity)]
    document_id: i64,
    #[orm(column = "Title_Text")]
    title: String,
    body: Option<Xml>,
    #[orm(sql_type = "[NVARCHAR](64)")]
    author: Option<String>,
    published: bool,
    #[orm(skip)]
    cached_len: usize,
}

#[derive(Debug, Default, Entity)]
struct Tag {
    label: String,
}

fn column(name: &str) -> &'static ColumnDef {
    Document::column(name).unwrap()
}

#[test]
fn names_default_and_override() {
    assert_eq!(Document::ENTITY_NAME, "Doc");
    assert_eq!(Document::SCHEMA, "archive");
    assert_eq!(Document::TABLE, "Documents");

    assert_eq!(Tag::ENTITY_NAME, "Tag");
    assert_eq!(Tag::SCHEMA, "dbo");
    assert_eq!(Tag::TABLE, "Tag");
}

#[test]
fn columns_follow_field_order() {
    let names: Vec<&str> = Document::columns().iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["DocumentId", "Title_Text", "Body", "Author", "Published"]);
}

#[test]
fn column_flags() {
    let id = column("DocumentId");
    assert!(id.primary_key && id.identity);
    assert_eq!(id.value_type, ValueType::Int64);
    assert_eq!(Document::primary_key().map(|c| c.name), Some("DocumentId"));

    let body = column("Body");
    assert!(body.nullable);
    assert_eq!(body.db_type, SqlDbType::Xml);
    assert!(body.needs_text_cast());

    let author = column("Author");
    assert_eq!(author.sql_type_text, "[NVARCHAR](64)");
    assert!(!column("Title_Text").nullable);
    assert!(Document::column("CachedLen").is_none());
    assert!(Tag::primary_key().is_none());
}

#[test]
fn values_in_column_order() {
    let doc = Document {
        document_id: 3,
        title: "Notes".into(),
        body: None,
        author: Some("Ada".into()),
        published: true,
        cached_len: 99,
    };
    assert_eq!(
        doc.values(),
        vec![
            Value::Int(3),
            Value::from("Notes"),
            Value::Null,
            Value::from("Ada"),
            Value::Bool(true),
        ]
    );
}

#[test]
fn hydrate_reads_prefixed_columns() {
    let row = Row::from_pairs([
        ("Doc__DocumentId", Value::Int(8)),
        ("Doc__Title_Text", Value::from("Spec")),
        ("Doc__Body", Value::from("<p/>")),
        ("Doc__Published", Value::Int(1)),
        ("Tag__Label", Value::from("ignored")),
    ]);
    let doc = Document::hydrate(&row, "Doc__").unwrap();
    assert_eq!(doc.document_id, 8);
    assert_eq!(doc.title, "Spec");
    assert_eq!(doc.body, Some(Xml::new("<p/>")));
    assert_eq!(doc.author, None);
    assert!(doc.published);
    assert_eq!(doc.cached_len, 0);
}

#[test]
fn hydrate_reports_type_mismatch() {
    let row = Row::from_pairs([("DocumentId", Value::from("not a number"))]);
    let err = Document::hydrate(&row, "").unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "DocumentId"));
}

#[derive(Debug, Default, Entity)]
struct Contact {
    #[orm(id)]
    id: i32,
    #[orm(required, max_len = 5)]
    code: Option<String>,
    #[orm(max_len = 3)]
    nickname: String,
}

#[test]
fn validate_checks_field_rules() {
    let ok = Contact {
        id: 1,
        code: Some("AB".into()),
        nickname: "Al".into(),
    };
    assert!(ok.validate().is_empty());

    let bad = Contact {
        id: 2,
        code: None,
        nickname: "Alexander".into(),
    };
    let errors = bad.validate();
    let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec!["Code", "Nickname"]);
    assert_eq!(errors.to_string(), "Code: Value cannot be null; Nickname: Max length is 3");

    let long = Contact {
        id: 3,
        code: Some("ABCDEF".into()),
        nickname: String::new(),
    };
    assert_eq!(long.validate().len(), 1);
    assert!(Tag::default().validate().is_empty());
}
