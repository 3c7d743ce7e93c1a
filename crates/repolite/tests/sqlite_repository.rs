#![cfg(all(feature = "sqlite", feature = "derive"))]

use repolite::prelude::*;
use repolite::{JoinedRow, SqliteAccess, SqliteConfig, ValidationCode};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "XmlTable")]
struct XmlRow {
    #[orm(id, identity)]
    id: i32,
    name: String,
    doc: Option<Xml>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "Orders")]
struct Order {
    #[orm(id)]
    id: i32,
    customer_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
struct Customer {
    #[orm(id)]
    id: i32,
    name: String,
    vip: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(schema = "geo")]
struct Address {
    customer_id: i32,
    city: Option<String>,
}

/// Declares one more column than the table has.
#[derive(Debug, Default, Entity)]
#[orm(name = "Drifted", table = "Customer")]
struct DriftedCustomer {
    #[orm(id)]
    id: i32,
    name: String,
    vip: bool,
    email: Option<String>,
}

/// Field rules on a table that does not exist: any write that got past
/// validation lands in the error sink.
#[derive(Debug, Default, Entity)]
#[orm(table = "Notes")]
struct Note {
    #[orm(id, identity)]
    id: i32,
    #[orm(required, max_len = 8)]
    title: Option<String>,
}

#[derive(Debug, Default, Entity)]
struct Missing {
    #[orm(id)]
    id: i32,
}

const SCHEMA: &str = "
    CREATE TABLE [dbo].[XmlTable] (
        [Id] INTEGER PRIMARY KEY AUTOINCREMENT,
        [Name] TEXT NOT NULL,
        [Doc] TEXT
    );
    CREATE TABLE [dbo].[Orders] ([Id] INTEGER PRIMARY KEY, [CustomerId] INTEGER NOT NULL);
    CREATE TABLE [dbo].[Customer] ([Id] INTEGER PRIMARY KEY, [Name] TEXT NOT NULL, [Vip] INTEGER NOT NULL);
    CREATE TABLE [geo].[Address] ([CustomerId] INTEGER NOT NULL, [City] TEXT);

    INSERT INTO [dbo].[XmlTable] ([Name], [Doc]) VALUES
        ('XML1', '<v>1</v>'), ('XML2', '<v>2</v>'), ('XML3', '<v>3</v>'),
        ('XML4', '<v>4</v>'), ('XML5', NULL);
    INSERT INTO [dbo].[Customer] VALUES (1, 'Ada', 1), (2, 'Bob', 0);
    INSERT INTO [dbo].[Orders] VALUES (10, 1), (11, 1), (12, 2);
    INSERT INTO [geo].[Address] VALUES (1, 'Paris');
";

struct Fixture {
    _dir: TempDir,
    access: SqliteAccess,
    reported: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path().join("main.db"))
            .attach("dbo", dir.path().join("dbo.db"))
            .attach("geo", dir.path().join("geo.db"));
        let access = SqliteAccess::new(config);
        access.execute_batch(SCHEMA).unwrap();
        Self {
            _dir: dir,
            access,
            reported: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn config(&self) -> RepositoryConfig {
        let reported = Arc::clone(&self.reported);
        RepositoryConfig::new().sink(move |e: &OrmError| reported.lock().unwrap().push(e.to_string()))
    }

    fn repo<E: repolite::Entity>(&self) -> Repository<E, SqliteAccess> {
        Repository::new(self.access.clone(), self.config()).unwrap()
    }
}

#[test]
fn like_matches_substring() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();

    let found = rows.where_("Name", Comparison::Like, "XML1").results().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "XML1");

    let all = rows.where_("Name", Comparison::Like, "XML").results().unwrap();
    assert_eq!(all.len(), 5);
}

#[test]
fn xml_column_compares_through_text_cast() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();

    let query = rows.where_("Doc", Comparison::Like, "<v>3</v>");
    assert_eq!(
        query.query_string().unwrap(),
        "SELECT [Id], [Name], [Doc] FROM [dbo].[XmlTable] \
         WHERE CONVERT(NVARCHAR(MAX), [Doc]) LIKE '%<v>3</v>%'"
    );
    let found = query.results().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "XML3");
    assert_eq!(found[0].doc, Some(Xml::new("<v>3</v>")));
}

#[test]
fn groups_and_null_checks() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();

    let found = rows
        .where_("Name", Comparison::Equals, "XML1")
        .or_begin_group_null("Doc", Comparison::IsNull)
        .and("Id", Comparison::GreaterThan, 0)
        .end_group()
        .results()
        .unwrap();
    let mut names: Vec<String> = found.into_iter().map(|r| r.name).collect();
    names.sort();
    assert_eq!(names, vec!["XML1", "XML5"]);
}

#[test]
fn unclosed_group_never_reaches_backend() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();
    let err = rows
        .where_("Id", Comparison::Equals, 1)
        .and_begin_group("Id", Comparison::Equals, 2)
        .results()
        .unwrap_err();
    assert_eq!(err, OrmError::UnclosedGroup(1));
    assert!(fx.reported.lock().unwrap().is_empty());
}

#[test]
fn large_in_lists_are_batched() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();
    let ids: Vec<i64> = (1..=4500).collect();

    let query = rows.where_("Id", Comparison::In, ids);
    assert_eq!(query.query_string().unwrap().matches("[Id] IN (").count(), 3);
    assert_eq!(query.results().unwrap().len(), 5);

    let none = rows.where_("Id", Comparison::In, Vec::<i64>::new()).results().unwrap();
    assert!(none.is_empty());
}

#[test]
fn typed_filter_and_search() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();
    let found = rows.filter(|t| t.col("Name").ends_with("5")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].doc, None);

    let customers = fx.repo::<Customer>();
    let vips = customers.filter(|c| c.col("Vip")).unwrap();
    assert_eq!(vips.len(), 1);
    assert_eq!(vips[0].name, "Ada");

    let bob = customers.search(&[("Name", Value::from("Bob")), ("Vip", Value::from(false))]).unwrap();
    assert_eq!(bob.len(), 1);
    assert!(customers.search(&[]).unwrap().is_empty());
}

#[test]
fn three_entity_join() {
    let fx = Fixture::new();
    let orders = fx.repo::<Order>();

    let chain = orders
        .inner_join::<Customer>()
        .on(|s| s.at(0).col("CustomerId").eq(s.at(1).col("Id")))
        .left_join::<Address>()
        .on(|s| s.of::<Customer>().col("Id").eq(s.last().col("CustomerId")));

    let sql = chain.to_sql().unwrap();
    assert!(sql.starts_with("SELECT [c0].[Id] AS 'Order__Id', "));
    assert!(sql.contains(" FROM [dbo].[Orders] c0 INNER JOIN [dbo].[Customer] c1 ON "));
    assert!(sql.contains(" LEFT OUTER JOIN [geo].[Address] c2 ON ([c1].[Id] = [c2].[CustomerId])"));

    let mut rows: Vec<JoinedRow> = chain.results().unwrap();
    rows.sort_by_key(|r| r.get::<Order>(0).map(|o| o.id));
    assert_eq!(rows.len(), 3);

    let first = &rows[0];
    assert_eq!(first.get::<Order>(0), Some(&Order { id: 10, customer_id: 1 }));
    assert_eq!(first.get::<Customer>(1).map(|c| c.name.as_str()), Some("Ada"));
    assert_eq!(
        first.get::<Address>(2).and_then(|a| a.city.as_deref()),
        Some("Paris")
    );

    let last = &rows[2];
    assert_eq!(last.get::<Customer>(1).map(|c| c.vip), Some(false));
    assert_eq!(last.get::<Address>(2), Some(&Address::default()));
}

#[test]
fn schema_drift_aborts_construction() {
    let fx = Fixture::new();
    let err = Repository::<DriftedCustomer, _>::new(fx.access.clone(), fx.config())
        .err()
        .unwrap();
    assert_eq!(
        err,
        OrmError::SchemaMismatch {
            schema: "dbo".into(),
            table: "Customer".into(),
            expected: 4,
            actual: 3,
        }
    );
}

#[test]
fn backend_errors_are_reported_not_returned() {
    let fx = Fixture::new();
    let missing: Repository<Missing, _> =
        Repository::new(fx.access.clone(), fx.config().skip_schema_validation()).unwrap();

    assert!(missing.get_all().unwrap().is_empty());
    assert_eq!(missing.record_count().unwrap(), 0);
    assert!(!missing.delete(&Missing { id: 1 }).unwrap());

    let reported = fx.reported.lock().unwrap();
    assert_eq!(reported.len(), 3);
    assert!(reported[0].contains("no such table"), "{}", reported[0]);
}

#[test]
fn injection_is_rejected_before_execution() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();

    let err = rows
        .where_("Name", Comparison::Equals, "x'; DROP TABLE [XmlTable]; --")
        .results()
        .unwrap_err();
    assert!(matches!(err, OrmError::InjectionSuspected(_)));

    assert!(matches!(
        rows.where_raw("1=1 /* comment */"),
        Err(OrmError::InjectionSuspected(_))
    ));
    assert_eq!(rows.record_count().unwrap(), 5);
    assert!(fx.reported.lock().unwrap().is_empty());
}

#[test]
fn create_update_delete() {
    let fx = Fixture::new();
    let rows = fx.repo::<XmlRow>();

    let new_row = XmlRow {
        id: 0,
        name: "O'Neil".into(),
        doc: Some(Xml::new("<v>6</v>")),
    };
    let keys = rows.create(&new_row).unwrap().unwrap();
    assert_eq!(keys.values(), &[Value::Int(6)]);
    assert_eq!(rows.record_count().unwrap(), 6);

    let mut stored = rows
        .where_("Name", Comparison::Equals, "O'Neil")
        .results()
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(stored.id, 6);

    stored.name = "Renamed".into();
    assert!(rows.update(&stored).unwrap());
    let renamed = rows.search(&[("Id", Value::from(6))]).unwrap();
    assert_eq!(renamed[0].name, "Renamed");

    assert!(rows.delete(&stored).unwrap());
    assert!(!rows.delete(&stored).unwrap());
    assert_eq!(rows.record_count().unwrap(), 5);

    assert_eq!(rows.delete_many("Id", vec![1, 2, 99]).unwrap(), 2);
    assert_eq!(rows.get_all().unwrap().len(), 3);
}

#[test]
fn bulk_create_counts_rows() {
    let fx = Fixture::new();
    let addresses = fx.repo::<Address>();
    let batch = vec![
        Address {
            customer_id: 2,
            city: Some("Oslo".into()),
        },
        Address {
            customer_id: 2,
            city: None,
        },
    ];
    assert_eq!(addresses.bulk_create(&batch).unwrap(), 2);
    assert_eq!(addresses.record_count().unwrap(), 3);

    let keyless = addresses.create(&batch[0]).unwrap().unwrap();
    assert!(keyless.is_empty());

    let err = addresses.update(&batch[0]).unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn has_value_skips_null_and_empty() {
    let fx = Fixture::new();
    fx.access
        .execute_batch("INSERT INTO [geo].[Address] VALUES (2, ''), (2, NULL);")
        .unwrap();
    let addresses = fx.repo::<Address>();

    let found = addresses.filter(|a| a.col("City").has_value()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].city.as_deref(), Some("Paris"));

    let unset = addresses.where_null("City", Comparison::IsNull).results().unwrap();
    assert_eq!(unset.len(), 1);
}

#[test]
fn create_returns_supplied_key() {
    let fx = Fixture::new();
    let customers = fx.repo::<Customer>();
    let carol = Customer {
        id: 40,
        name: "Carol".into(),
        vip: false,
    };
    let keys = customers.create(&carol).unwrap().unwrap();
    assert_eq!(keys.values(), &[Value::Int(40)]);

    // Duplicate key: the backend refuses and the sink is told.
    assert_eq!(customers.create(&carol).unwrap(), None);
    assert_eq!(fx.reported.lock().unwrap().len(), 1);
}

#[test]
fn update_columns_writes_only_named_columns() {
    let fx = Fixture::new();
    let customers = fx.repo::<Customer>();

    let mut ada = customers.find_by("Id", FindComparison::Equals, 1).unwrap().pop().unwrap();
    ada.name = "Ada L".into();
    ada.vip = false;
    assert!(customers.update_columns(&ada, &["Name"]).unwrap());

    let stored = customers.find_by("Id", FindComparison::Equals, 1).unwrap().pop().unwrap();
    assert_eq!(stored.name, "Ada L");
    assert!(stored.vip);

    let rejected: [&[&str]; 4] = [&["Id"], &["Nope"], &[], &["Name", "Name"]];
    for columns in rejected {
        let err = customers.update_columns(&ada, columns).unwrap_err();
        assert!(err.is_validation_error(), "{columns:?}: {err}");
    }
    assert!(!customers.update_columns(&Customer { id: 99, ..ada }, &["Vip"]).unwrap());
    assert!(fx.reported.lock().unwrap().is_empty());
}

#[test]
fn find_by_applies_one_comparison() {
    let fx = Fixture::new();
    let customers = fx.repo::<Customer>();

    let later = customers.find_by("Id", FindComparison::GreaterThan, 1).unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].name, "Bob");

    let named = customers.find_by("Name", FindComparison::Like, "d").unwrap();
    assert_eq!(named.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1]);

    let others = customers.find_by("Name", FindComparison::NotEquals, "Bob").unwrap();
    assert_eq!(others.len(), 1);
    assert!(customers.find_by("Id", FindComparison::LessThanOrEquals, 0).unwrap().is_empty());
}

#[test]
fn invalid_entities_are_not_written() {
    let fx = Fixture::new();
    let notes: Repository<Note, _> =
        Repository::new(fx.access.clone(), fx.config().skip_schema_validation()).unwrap();

    let untitled = Note { id: 1, title: None };
    let err = notes.create(&untitled).unwrap_err();
    assert!(err.is_validation_error());
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.items[0].field, "Title");
    assert_eq!(errors.items[0].code, ValidationCode::Required);

    let long = Note {
        id: 1,
        title: Some("far too long".into()),
    };
    assert!(notes.update(&long).unwrap_err().is_validation_error());
    assert!(notes.update_columns(&long, &["Title"]).unwrap_err().is_validation_error());

    let batch = vec![
        Note {
            id: 0,
            title: Some("ok".into()),
        },
        untitled,
    ];
    assert!(matches!(
        notes.bulk_create(&batch),
        Err(OrmError::InvalidEntity { entity: "Note", .. })
    ));
    assert!(fx.reported.lock().unwrap().is_empty());

    // A valid note gets as far as the backend, which has no such table.
    assert_eq!(notes.create(&batch[0]).unwrap(), None);
    assert_eq!(fx.reported.lock().unwrap().len(), 1);
}
