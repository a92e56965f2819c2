//! Loading a [`ResourceGraph`] and committing [`ChangeSet`]s.

use rusqlite::Connection;
use trellis_core::{ChangeSet, Entity, EntityKey, Persistence, ResourceGraph};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::{kanbans, pages, projects, roles, users};

fn write_entity(conn: &Connection, entity: &Entity) -> rusqlite::Result<()> {
    match entity {
        Entity::User(user) => users::upsert_user(conn, user),
        Entity::Project(project) => projects::upsert_project(conn, project),
        Entity::Membership(membership) => projects::upsert_membership(conn, membership),
        Entity::Role(role) => roles::upsert_role(conn, role),
        Entity::Kanban(kanban) => kanbans::upsert_kanban(conn, kanban),
        Entity::Column(column) => kanbans::upsert_column(conn, column),
        Entity::Element(element) => kanbans::upsert_element(conn, element),
        Entity::Comment(comment) => kanbans::upsert_comment(conn, comment),
        Entity::Page(page) => pages::upsert_page(conn, page),
        Entity::VisitMark(mark) => pages::upsert_visit_mark(conn, mark),
    }
}

fn delete_entity(conn: &Connection, key: &EntityKey) -> rusqlite::Result<usize> {
    match *key {
        EntityKey::User(id) => users::delete_user(conn, id),
        EntityKey::Project(id) => projects::delete_project(conn, id),
        EntityKey::Membership(project, user) => projects::delete_membership(conn, project, user),
        EntityKey::Role(id) => roles::delete_role(conn, id),
        EntityKey::Kanban(id) => kanbans::delete_kanban(conn, id),
        EntityKey::Column(id) => kanbans::delete_column(conn, id),
        EntityKey::Element(id) => kanbans::delete_element(conn, id),
        EntityKey::Comment(id) => kanbans::delete_comment(conn, id),
        EntityKey::Page(id) => pages::delete_page(conn, id),
        EntityKey::VisitMark(user, page) => pages::delete_visit_mark(conn, user, page),
    }
}

impl Database {
    /// Read every stored entity into a fresh graph.
    pub fn load_graph(&self) -> Result<ResourceGraph> {
        let mut entities = Vec::new();
        entities.extend(self.list_users()?.into_iter().map(Entity::User));
        entities.extend(self.list_projects()?.into_iter().map(Entity::Project));
        entities.extend(self.list_memberships()?.into_iter().map(Entity::Membership));
        entities.extend(self.list_all_roles()?.into_iter().map(Entity::Role));
        entities.extend(self.list_kanbans()?.into_iter().map(Entity::Kanban));
        entities.extend(self.list_all_columns()?.into_iter().map(Entity::Column));
        entities.extend(self.list_all_elements()?.into_iter().map(Entity::Element));
        entities.extend(self.list_all_comments()?.into_iter().map(Entity::Comment));
        entities.extend(self.list_all_pages()?.into_iter().map(Entity::Page));
        entities.extend(self.list_all_visit_marks()?.into_iter().map(Entity::VisitMark));

        tracing::debug!(entities = entities.len(), "graph loaded");
        Ok(ResourceGraph::from_entities(entities))
    }

    /// Replace nothing, insert everything: write a whole graph in one
    /// transaction. Used to seed a fresh database.
    pub fn save_graph(&mut self, graph: &ResourceGraph) -> Result<()> {
        let mut changes = ChangeSet::default();
        for entity in graph.entities() {
            changes.record_write(entity);
        }
        self.commit(&changes)
    }
}

impl Persistence for Database {
    type Error = StoreError;

    fn commit(&mut self, changes: &ChangeSet) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        // Parents and children are written in arbitrary order; checked at COMMIT.
        tx.pragma_update(None, "defer_foreign_keys", "ON")?;

        for key in changes.deletes() {
            delete_entity(&tx, key)?;
        }
        for entity in changes.writes() {
            write_entity(&tx, entity)?;
        }

        tx.commit()?;
        tracing::debug!(
            writes = changes.writes().len(),
            deletes = changes.deletes().len(),
            "change set committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use trellis_core::{
        CoreConfig, DocumentConnector, ElementDraft, KanbanConnector, KanbanElement, Manager, NewCustomRole,
        NewPage,
    };
    use trellis_shared::{ColumnId, ElementId, ElementStatus, ProjectRole, UserId};

    use super::*;

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("trellis.db")).unwrap();
        (dir, db)
    }

    fn assert_same(graph: &ResourceGraph, loaded: &ResourceGraph) {
        let entities = graph.entities();
        assert_eq!(entities.len(), loaded.entities().len());
        for entity in entities {
            assert_eq!(loaded.get(&entity.key()).as_ref(), Some(&entity));
        }
    }

    #[test]
    fn operations_survive_a_reload() {
        let (_dir, db) = open();
        let mut manager = Manager::new(ResourceGraph::new(), db, CoreConfig::default());

        manager.register_user("ada", "Ada", "ada@example.org").unwrap();
        let bob = manager.register_user("bob", "Bob", "bob@example.org").unwrap();
        let project = manager.create_project("ada", "Launch").unwrap();
        let kanban = manager.create_kanban("ada", project.id, "Board").unwrap().unwrap();
        let todo = manager.add_column("ada", kanban.id, "Todo").unwrap().unwrap();
        let done = manager.add_column("ada", kanban.id, "Done").unwrap().unwrap();
        let mut elements = Vec::new();
        for name in ["A", "B", "C"] {
            let draft = ElementDraft {
                name: name.into(),
                tag: Some("ops".into()),
                content: format!("{name} body"),
            };
            elements.push(manager.add_element("ada", todo.id, draft).unwrap().unwrap().id);
        }
        assert!(manager.transport_element("ada", elements[1], done.id, 0).unwrap());
        assert!(manager.archive("ada", elements[0]).unwrap());
        assert!(manager.set_element_photo("ada", elements[2], Some(vec![0x89, 0x50, 0x4e])).unwrap());

        let root = manager
            .create_page("ada", project.id, NewPage { name: "Handbook".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        manager
            .create_page(
                "ada",
                project.id,
                NewPage { parent: Some(root.id), name: "Intro".into(), content: "hello".into() },
            )
            .unwrap()
            .unwrap();
        let role = manager
            .create_custom_role(
                "ada",
                project.id,
                NewCustomRole {
                    name: "Writers".into(),
                    can_edit_resources: true,
                    kanban_grants: vec![KanbanConnector { kanban: kanban.id, can_edit: false }],
                    page_grants: vec![DocumentConnector { page: root.id, can_edit: true }],
                },
            )
            .unwrap()
            .unwrap();
        assert!(manager
            .add_member("ada", project.id, bob.id, ProjectRole::Custom(role.id))
            .unwrap());
        manager.add_comment("ada", elements[2], "needs a better photo").unwrap().unwrap();
        assert!(manager.publish_page("ada", root.id, true).unwrap());
        assert!(manager.find_page("bob", root.id).unwrap().is_some());

        let (graph, db) = manager.into_parts();
        let loaded = db.load_graph().unwrap();
        assert_same(&graph, &loaded);
        assert!(trellis_core::audit::verify(&loaded).is_empty());

        let done_elements = db.list_elements(done.id, ElementStatus::Alive).unwrap();
        assert_eq!(done_elements.len(), 1);
        assert_eq!(done_elements[0].id, elements[1]);
        assert_eq!(db.get_role(role.id).unwrap().document_connectors.len(), 1);
        let comments = db.list_comments(elements[2]).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "needs a better photo");
        let visits = db.list_visit_marks(bob.id).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!((visits[0].page, visits[0].serial_number), (root.id, 0));
    }

    #[test]
    fn cascades_and_demotions_are_persisted() {
        let (_dir, db) = open();
        let mut manager = Manager::new(ResourceGraph::new(), db, CoreConfig::default());
        let ada_id = manager.register_user("ada", "Ada", "ada@example.org").unwrap().id;
        let bob = manager.register_user("bob", "Bob", "bob@example.org").unwrap();
        let project = manager.create_project("ada", "Docs").unwrap();
        let root = manager
            .create_page("ada", project.id, NewPage { name: "Root".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        let child = manager
            .create_page("ada", project.id, NewPage { parent: Some(root.id), name: "Child".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        let role = manager
            .create_custom_role(
                "ada",
                project.id,
                NewCustomRole {
                    name: "Readers".into(),
                    page_grants: vec![DocumentConnector { page: root.id, can_edit: false }],
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        manager
            .add_member("ada", project.id, bob.id, ProjectRole::Custom(role.id))
            .unwrap();
        for page in [root.id, child.id] {
            assert!(manager.publish_page("ada", page, true).unwrap());
        }
        manager.find_page("bob", child.id).unwrap().unwrap();
        manager.find_page("ada", root.id).unwrap().unwrap();
        assert_eq!(manager.persistence().list_visit_marks(bob.id).unwrap().len(), 1);

        assert!(manager.delete_page("ada", root.id).unwrap());
        assert!(manager.delete_custom_role("ada", role.id).unwrap());

        let (graph, db) = manager.into_parts();
        assert!(matches!(db.get_page(child.id), Err(StoreError::NotFound)));
        assert!(matches!(db.get_role(role.id), Err(StoreError::NotFound)));
        assert!(db.list_visit_marks(bob.id).unwrap().is_empty());
        assert!(db.list_visit_marks(ada_id).unwrap().is_empty());
        let members = db.list_members(project.id).unwrap();
        let bob_role = members.iter().find(|m| m.user == bob.id).map(|m| m.role);
        assert_eq!(bob_role, Some(ProjectRole::StandardUser));
        assert_same(&graph, &db.load_graph().unwrap());
    }

    #[test]
    fn rejected_commit_writes_nothing() {
        let (_dir, mut db) = open();
        let now = Utc::now();
        let owner = UserId::new();
        let orphan = KanbanElement {
            id: ElementId::new(),
            column: ColumnId::new(),
            owner,
            last_redactor: owner,
            serial_number: 0,
            name: "orphan".into(),
            tag: None,
            content: String::new(),
            photo: None,
            status: ElementStatus::Alive,
            created_at: now,
            updated_at: now,
        };
        let mut changes = ChangeSet::default();
        changes.record_write(Entity::User(trellis_core::User {
            id: UserId::new(),
            username: "ada".into(),
            display_name: "Ada".into(),
            email: "ada@example.org".into(),
        }));
        changes.record_write(Entity::Element(orphan));

        assert!(db.commit(&changes).is_err());
        assert!(db.list_users().unwrap().is_empty());
    }

    #[test]
    fn save_graph_seeds_a_database() {
        let (_dir, mut db) = open();
        let mut manager = Manager::new(ResourceGraph::new(), trellis_core::MemoryJournal::new(), CoreConfig::default());
        manager.register_user("ada", "Ada", "ada@example.org").unwrap();
        let project = manager.create_project("ada", "Seed").unwrap();
        let root = manager
            .create_page("ada", project.id, NewPage { name: "Root".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        for name in ["a", "b"] {
            manager
                .create_page("ada", project.id, NewPage { parent: Some(root.id), name: name.into(), ..Default::default() })
                .unwrap();
        }

        let (graph, _) = manager.into_parts();
        db.save_graph(&graph).unwrap();
        assert_same(&graph, &db.load_graph().unwrap());
        assert_eq!(db.list_pages(project.id).unwrap().len(), 3);
    }
}
