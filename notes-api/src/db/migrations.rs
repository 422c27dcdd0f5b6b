use lazy_static::lazy_static;
use rusqlite_migration::{Migrations, M};

lazy_static! {
    pub static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![
        M::up(
            r#"
            CREATE TABLE notes (
                seq INTEGER PRIMARY KEY,
                id BLOB CHECK(length(id) = 16) NOT NULL UNIQUE DEFAULT (uuid7_now()),
                owner BLOB CHECK(length(owner) = 16) NOT NULL,

                title TEXT NOT NULL,
                content TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]' CHECK(json_valid(tags)),

                image_ref BLOB CHECK(length(image_ref) = 16),
                image_url TEXT,

                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            CREATE INDEX notes_by_owner ON notes (owner, created_at);
        "#
        ),
        M::up(
            r#"
            CREATE VIRTUAL TABLE notes_title_fts USING fts5(
                title,
                content = 'notes',
                content_rowid = 'seq',
                tokenize = 'unicode61 remove_diacritics 2'
            );

            CREATE VIRTUAL TABLE notes_content_fts USING fts5(
                content,
                content = 'notes',
                content_rowid = 'seq',
                tokenize = 'unicode61 remove_diacritics 2'
            );

            CREATE TRIGGER notes_fts_insert AFTER INSERT ON notes BEGIN
                INSERT INTO notes_title_fts (rowid, title) VALUES (new.seq, new.title);
                INSERT INTO notes_content_fts (rowid, content) VALUES (new.seq, new.content);
            END;

            CREATE TRIGGER notes_fts_update AFTER UPDATE OF title, content ON notes BEGIN
                INSERT INTO notes_title_fts (notes_title_fts, rowid, title) VALUES ('delete', old.seq, old.title);
                INSERT INTO notes_content_fts (notes_content_fts, rowid, content) VALUES ('delete', old.seq, old.content);
                INSERT INTO notes_title_fts (rowid, title) VALUES (new.seq, new.title);
                INSERT INTO notes_content_fts (rowid, content) VALUES (new.seq, new.content);
            END;

            CREATE TRIGGER notes_fts_delete AFTER DELETE ON notes BEGIN
                INSERT INTO notes_title_fts (notes_title_fts, rowid, title) VALUES ('delete', old.seq, old.title);
                INSERT INTO notes_content_fts (notes_content_fts, rowid, content) VALUES ('delete', old.seq, old.content);
            END;
        "#
        ),
        M::up(
            r#"
            CREATE TABLE storage_blobs (
                id BLOB PRIMARY KEY CHECK(length(id) = 16) NOT NULL UNIQUE DEFAULT (uuid7_now()),
                content_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                data BLOB NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE upload_targets (
                token TEXT PRIMARY KEY NOT NULL,
                created_by BLOB CHECK(length(created_by) = 16) NOT NULL,
                expires_at DATETIME NOT NULL
            );
        "#
        ),
    ]);
}
