mod graphql_integration {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_graphql::dynamic::Schema;
	use kvql::err::Error;
	use kvql::gql::{SchemaBuilder, build_schema};
	use kvql::kvs::{Datastore, Entry, Key, Operation, Transactable};
	use kvql::val::{Row, Value};
	use kvql::vs::VersionStamp;
	use serde_json::json;
	use test_log::test;

	const LIBRARY: &str = r#"
		type Query {
			bookById(id: ID!): Book
			booksByIds(ids: [ID!]!): [Book]
			authorById(id: ID!): Author
		}

		type Book {
			id: ID!,
			title: String,
			author: Author,
		}

		type Author {
			id: ID!,
			name: String,
			book: Book,
			books: [Book],
		}
	"#;

	const DELETE: &str = r#"
		type Query {
			bookById(id: ID!): BookResult
		}

		type Mutation {
			deleteTransaction(data: DeleteInput!): Result
		}

		type BookResult {
			id: ID!
			versionstamp: String!
			value: Book!
		}

		type Book {
			id: ID!,
			title: String,
		}

		type Author {
			id: ID!,
			name: String,
		}

		input DeleteInput {
			deleteBookById: [Identifier!]! @delete(table: "Book")
			deleteAuthorById: [Identifier!] @delete(table: "Author")
		}

		input Identifier {
			id: ID!,
			versionstamp: String!
		}

		type Result {
			versionstamp: String!
		}
	"#;

	fn row(v: serde_json::Value) -> Row {
		match Value::from(v) {
			Value::Object(o) => o,
			v => panic!("expected an object, found {v}"),
		}
	}

	type Errors = Vec<(String, serde_json::Value)>;

	async fn execute(schema: &Schema, source: &str) -> (serde_json::Value, Errors) {
		let res = schema.execute(source).await;
		let errors = res
			.errors
			.iter()
			.map(|e| (e.message.clone(), serde_json::to_value(&e.path).unwrap()))
			.collect();
		(res.data.into_json().unwrap(), errors)
	}

	async fn library() -> Arc<Datastore> {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(
				Key::new("Book", 1),
				row(json!({ "id": 1, "title": "Shadows of Eternity", "author": 11 })),
			)
			.set(Key::new("Author", 11), row(json!({ "id": 11, "name": "Victoria Nightshade", "book": 1 })))
			.commit()
			.await
			.unwrap()
			.unwrap();
		ds
	}

	#[test(tokio::test)]
	async fn minimal_working_example() {
		let ds = library().await;
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) =
			execute(&schema, r#"query { bookById(id: "1") { id, title, author { id, name } } }"#).await;
		assert_eq!(errors, vec![]);
		assert_eq!(
			data,
			json!({
				"bookById": {
					"id": "1",
					"title": "Shadows of Eternity",
					"author": { "id": "11", "name": "Victoria Nightshade" }
				}
			})
		);
	}

	#[test(tokio::test)]
	async fn integer_id_argument() {
		let ds = library().await;
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) = execute(&schema, "{ bookById(id: 1) { id } }").await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "bookById": { "id": "1" } }));
	}

	#[test(tokio::test)]
	async fn bad_id() {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Shadows of Eternity", "author": 999 })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ bookById(id: "1") { id, title, author { id, name } } }"#).await;
		assert_eq!(
			data,
			json!({ "bookById": { "id": "1", "title": "Shadows of Eternity", "author": null } })
		);
		assert_eq!(
			errors,
			vec![(
				"Expected referenced table 'Author' to have row with id '999'".to_owned(),
				json!(["bookById", "author"])
			)]
		);
	}

	#[test(tokio::test)]
	async fn missing_non_null_reference_bubbles() {
		let sdl = r#"
			type Query { bookById(id: ID!): Book }
			type Book { id: ID!, title: String, author: Author! }
			type Author { id: ID!, name: String }
		"#;
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Shadows of Eternity" })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, sdl).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ bookById(id: "1") { id, title, author { id } } }"#).await;
		assert_eq!(data, json!({ "bookById": null }));
		assert_eq!(
			errors,
			vec![("Expected column 'author' to contain id".to_owned(), json!(["bookById", "author"]))]
		);
	}

	#[test(tokio::test)]
	async fn dangling_non_null_reference_bubbles() {
		let sdl = r#"
			type Query { bookById(id: ID!): Book }
			type Book { id: ID!, title: String, author: Author! }
			type Author { id: ID!, name: String }
		"#;
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Shadows of Eternity", "author": 999 })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, sdl).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ bookById(id: "1") { id, title, author { id } } }"#).await;
		assert_eq!(data, json!({ "bookById": null }));
		assert_eq!(
			errors,
			vec![(
				"Expected referenced table 'Author' to have row with id '999'".to_owned(),
				json!(["bookById", "author"])
			)]
		);
	}

	#[test(tokio::test)]
	async fn reference_column_without_an_id() {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Shadows of Eternity", "author": true })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ bookById(id: "1") { title, author { id } } }"#).await;
		assert_eq!(data, json!({ "bookById": { "title": "Shadows of Eternity", "author": null } }));
		assert_eq!(
			errors,
			vec![(
				"Expected column 'author' to contain id, found bool".to_owned(),
				json!(["bookById", "author"])
			)]
		);
	}

	#[test(tokio::test)]
	async fn missing_non_null_reference_list_bubbles() {
		let sdl = r#"
			type Query { authorById(id: ID!): Author }
			type Book { id: ID! }
			type Author { id: ID!, name: String, books: [Book]! }
		"#;
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Author", 12), row(json!({ "name": "Orion Blackwood" })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, sdl).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ authorById(id: "12") { name, books { id } } }"#).await;
		assert_eq!(data, json!({ "authorById": null }));
		assert_eq!(
			errors,
			vec![("Expected column 'books' to contain id".to_owned(), json!(["authorById", "books"]))]
		);
	}

	#[test(tokio::test)]
	async fn null_nullable_reference() {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Untitled", "author": null })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) = execute(&schema, r#"{ bookById(id: "1") { author { id } } }"#).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "bookById": { "author": null } }));
	}

	#[test(tokio::test)]
	async fn cyclical_references() {
		let ds = library().await;
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) = execute(
			&schema,
			r#"{ bookById(id: "1") { id, title, author { id, name, book { id, title } } } }"#,
		)
		.await;
		assert_eq!(errors, vec![]);
		assert_eq!(
			data,
			json!({
				"bookById": {
					"id": "1",
					"title": "Shadows of Eternity",
					"author": {
						"id": "11",
						"name": "Victoria Nightshade",
						"book": { "id": "1", "title": "Shadows of Eternity" }
					}
				}
			})
		);
	}

	#[test(tokio::test)]
	async fn bad_id_in_cycle() {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Shadows of Eternity", "author": 11 })))
			.set(Key::new("Author", 11), row(json!({ "name": "Victoria Nightshade", "book": 999 })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) = execute(
			&schema,
			r#"{ bookById(id: "1") { id, author { id, book { id, title } } } }"#,
		)
		.await;
		assert_eq!(
			data,
			json!({ "bookById": { "id": "1", "author": { "id": "11", "book": null } } })
		);
		assert_eq!(
			errors,
			vec![(
				"Expected referenced table 'Book' to have row with id '999'".to_owned(),
				json!(["bookById", "author", "book"])
			)]
		);
	}

	#[test(tokio::test)]
	async fn root_miss_is_not_an_error() {
		let ds = library().await;
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) = execute(&schema, r#"{ bookById(id: "2") { id } }"#).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "bookById": null }));
	}

	#[test(tokio::test)]
	async fn root_lookup_by_ids_keeps_order() {
		let ds = library().await;
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ booksByIds(ids: ["1", "2", "1"]) { id, title } }"#).await;
		assert_eq!(errors, vec![]);
		assert_eq!(
			data,
			json!({ "booksByIds": [
				{ "id": "1", "title": "Shadows of Eternity" },
				null,
				{ "id": "1", "title": "Shadows of Eternity" }
			] })
		);
	}

	#[test(tokio::test)]
	async fn reference_list_reports_each_missing_element() {
		let ds = library().await;
		ds.atomic()
			.set(Key::new("Book", 2), row(json!({ "title": "Echoes of Tomorrow", "author": 11 })))
			.set(Key::new("Author", 12), row(json!({ "name": "Orion Blackwood", "books": [1, 999, 2] })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let (data, errors) = execute(&schema, r#"{ authorById(id: "12") { books { id } } }"#).await;
		assert_eq!(
			data,
			json!({ "authorById": { "books": [{ "id": "1" }, null, { "id": "2" }] } })
		);
		assert_eq!(
			errors,
			vec![(
				"Expected referenced table 'Book' to have row with id '999'".to_owned(),
				json!(["authorById", "books", 1])
			)]
		);
	}

	#[test(tokio::test)]
	async fn reference_list_with_non_null_items_fails_whole_field() {
		let sdl = r#"
			type Query { authorById(id: ID!): Author }
			type Book { id: ID! }
			type Author { id: ID!, name: String, books: [Book!] }
		"#;
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		ds.atomic()
			.set(Key::new("Book", 1), row(json!({})))
			.set(Key::new("Author", 12), row(json!({ "name": "Orion Blackwood", "books": [1, 999] })))
			.commit()
			.await
			.unwrap();
		let schema = build_schema(&ds, sdl).unwrap();
		let (data, errors) =
			execute(&schema, r#"{ authorById(id: "12") { name, books { id } } }"#).await;
		assert_eq!(data, json!({ "authorById": { "name": "Orion Blackwood", "books": null } }));
		assert_eq!(
			errors,
			vec![(
				"Expected referenced table 'Book' to have row with id '999'".to_owned(),
				json!(["authorById", "books"])
			)]
		);
	}

	async fn seeded_delete() -> (Arc<Datastore>, Schema, VersionStamp) {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		let vs = ds
			.atomic()
			.set(Key::new("Book", 1), row(json!({ "title": "Shadows of Eternity" })))
			.set(Key::new("Author", 11), row(json!({ "name": "Victoria Nightshade" })))
			.commit()
			.await
			.unwrap()
			.unwrap();
		let schema = build_schema(&ds, DELETE).unwrap();
		(ds, schema, vs)
	}

	#[test(tokio::test)]
	async fn read_versionstamp_then_delete() {
		let (ds, schema, _) = seeded_delete().await;
		let (data, errors) = execute(
			&schema,
			r#"{ bookById(id: "1") { id, versionstamp, value { id, title } } }"#,
		)
		.await;
		assert_eq!(errors, vec![]);
		assert_eq!(
			data,
			json!({ "bookById": {
				"id": "1",
				"versionstamp": "00000000000000010000",
				"value": { "id": "1", "title": "Shadows of Eternity" }
			} })
		);
		let vs = data["bookById"]["versionstamp"].as_str().unwrap();
		let source = format!(
			r#"mutation {{
				deleteTransaction(data: {{
					deleteBookById: [{{ id: "1", versionstamp: "{vs}" }}]
				}}) {{ versionstamp }}
			}}"#
		);
		let (data, errors) = execute(&schema, &source).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": { "versionstamp": "00000000000000020000" } }));
		let (data, errors) = execute(&schema, r#"{ bookById(id: "1") { versionstamp } }"#).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "bookById": null }));
	}

	#[test(tokio::test)]
	async fn empty_delete_commits_nothing() {
		let (ds, schema, _) = seeded_delete().await;
		let (data, errors) = execute(
			&schema,
			r#"mutation { deleteTransaction(data: { deleteBookById: [] }) { versionstamp } }"#,
		)
		.await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": null }));
		// The next commit still gets the next versionstamp
		let vs = ds
			.atomic()
			.set(Key::new("Book", 2), row(json!({ "title": "Echoes of Tomorrow" })))
			.commit()
			.await
			.unwrap()
			.unwrap();
		assert_eq!(vs.to_string(), "00000000000000020000");
	}

	#[test(tokio::test)]
	async fn delete_missing_row() {
		let (ds, schema, _) = seeded_delete().await;
		let (data, errors) = execute(
			&schema,
			r#"mutation {
				deleteTransaction(data: {
					deleteBookById: [{ id: "999", versionstamp: "00000000000000010000" }]
				}) { versionstamp }
			}"#,
		)
		.await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": null }));
		assert!(ds.get(&Key::new("Book", "999")).await.unwrap().is_none());
	}

	#[test(tokio::test)]
	async fn delete_with_current_versionstamp() {
		let (ds, schema, vs) = seeded_delete().await;
		assert_eq!(vs.to_string(), "00000000000000010000");
		let source = format!(
			r#"mutation {{
				deleteTransaction(data: {{
					deleteBookById: [{{ id: "1", versionstamp: "{vs}" }}]
				}}) {{ versionstamp }}
			}}"#
		);
		let (data, errors) = execute(&schema, &source).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": { "versionstamp": "00000000000000020000" } }));
		assert!(ds.get(&Key::new("Book", 1)).await.unwrap().is_none());

		// Running the same delete again finds no row to check against
		let (data, errors) = execute(&schema, &source).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": null }));
	}

	#[test(tokio::test)]
	async fn delete_with_stale_versionstamp() {
		let (ds, schema, _) = seeded_delete().await;
		let (data, errors) = execute(
			&schema,
			r#"mutation {
				deleteTransaction(data: {
					deleteBookById: [{ id: "1", versionstamp: "00000000000000050000" }]
				}) { versionstamp }
			}"#,
		)
		.await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": null }));
		assert!(ds.get(&Key::new("Book", 1)).await.unwrap().is_some());
	}

	#[test(tokio::test)]
	async fn delete_across_tables_is_atomic() {
		let (ds, schema, vs) = seeded_delete().await;
		let source = format!(
			r#"mutation {{
				deleteTransaction(data: {{
					deleteBookById: [{{ id: "1", versionstamp: "{vs}" }}]
					deleteAuthorById: [{{ id: "11", versionstamp: "00000000000000090000" }}]
				}}) {{ versionstamp }}
			}}"#
		);
		let (data, errors) = execute(&schema, &source).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "deleteTransaction": null }));
		assert!(ds.get(&Key::new("Book", 1)).await.unwrap().is_some());
		assert!(ds.get(&Key::new("Author", 11)).await.unwrap().is_some());
	}

	#[test(tokio::test)]
	async fn malformed_versionstamp_is_an_error() {
		let (ds, schema, _) = seeded_delete().await;
		let (data, errors) = execute(
			&schema,
			r#"mutation {
				deleteTransaction(data: { deleteBookById: [{ id: "1", versionstamp: "not-hex" }] }) { versionstamp }
			}"#,
		)
		.await;
		assert_eq!(data, json!({ "deleteTransaction": null }));
		assert_eq!(errors.len(), 1);
		assert!(errors[0].0.contains(r#"invalid versionstamp "not-hex""#), "{}", errors[0].0);
		assert_eq!(errors[0].1, json!(["deleteTransaction"]));
		assert!(ds.get(&Key::new("Book", 1)).await.unwrap().is_some());
	}

	#[test(tokio::test)]
	async fn create_then_update() {
		let sdl = r#"
			type Query { bookById(id: ID!): Book }
			type Mutation { write(data: WriteInput!): String }
			type Book { id: ID!, title: String, pages: Int }
			input NewBook { id: ID!, title: String, pages: Int }
			input ChangedBook { id: ID!, versionstamp: String!, title: String, pages: Int }
			input WriteInput {
				createBook: [NewBook!] @create(table: "Book")
				updateBook: [ChangedBook!] @update(table: "Book")
			}
		"#;
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		let schema = build_schema(&ds, sdl).unwrap();

		let create = r#"mutation { write(data: { createBook: [{ id: "7", title: "Draft", pages: 10 }] }) }"#;
		let (data, errors) = execute(&schema, create).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "write": "00000000000000010000" }));
		// A second create of the same id conflicts
		let (data, _) = execute(&schema, create).await;
		assert_eq!(data, json!({ "write": null }));

		let update = r#"mutation {
			write(data: { updateBook: [{ id: "7", versionstamp: "00000000000000010000", title: "Final" }] })
		}"#;
		let (data, errors) = execute(&schema, update).await;
		assert_eq!(errors, vec![]);
		assert_eq!(data, json!({ "write": "00000000000000020000" }));

		let (data, _) = execute(&schema, r#"{ bookById(id: "7") { id, title, pages } }"#).await;
		assert_eq!(data, json!({ "bookById": { "id": "7", "title": "Final", "pages": null } }));
	}

	#[test(tokio::test)]
	async fn middleware_runs_before_resolver() {
		let ds = library().await;
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let schema = SchemaBuilder::new(&ds, LIBRARY)
			.unwrap()
			.middleware("Book", "title", move |_| {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(())
			})
			.unwrap()
			.middleware("Author", "name", |_| Err(async_graphql::Error::new("not allowed")))
			.unwrap()
			.finish()
			.unwrap();
		let (data, errors) =
			execute(&schema, r#"{ bookById(id: "1") { title, author { name } } }"#).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(
			data,
			json!({ "bookById": { "title": "Shadows of Eternity", "author": { "name": null } } })
		);
		assert_eq!(errors, vec![("not allowed".to_owned(), json!(["bookById", "author", "name"]))]);
	}

	struct Unavailable;

	#[async_trait::async_trait]
	impl Transactable for Unavailable {
		fn kind(&self) -> &'static str {
			"unavailable"
		}

		async fn get(&self, _: &Key) -> Result<Option<Entry>, Error> {
			Err(Error::Ds("connection refused".to_owned()))
		}

		async fn commit(&self, _: Operation) -> Result<Option<VersionStamp>, Error> {
			Err(Error::Tx("connection refused".to_owned()))
		}
	}

	#[test(tokio::test)]
	async fn store_faults_surface_as_internal_errors() {
		let ds = Arc::new(Datastore::from_store(Unavailable));
		let schema = build_schema(&ds, LIBRARY).unwrap();
		let res = schema.execute(r#"{ bookById(id: "1") { id } }"#).await;
		assert_eq!(res.data.into_json().unwrap(), json!({ "bookById": null }));
		assert_eq!(res.errors.len(), 1);
		assert_eq!(res.errors[0].message, "Internal Error");
		let code = res.errors[0].extensions.as_ref().and_then(|e| e.get("code")).cloned();
		assert_eq!(code, Some(async_graphql::Value::from("DbError")));
	}

	#[test(tokio::test)]
	async fn invalid_documents_are_schema_errors() {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		let res = build_schema(&ds, "type Query { count: Int }");
		assert!(matches!(res, Err(kvql::gql::GqlError::SchemaError(_))));
	}
}
