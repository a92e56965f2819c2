//! Document page trees.
//!
//! Pages are ordered among the siblings sharing their [`PageSlot`]. Every
//! non-root page records the root of its tree, and access is decided on that
//! root, so moving a page between trees rewrites `root` for its whole
//! subtree.
//!
//! Opening a page leaves a [`VisitMark`] for the reader. A user's marks are
//! kept ordered latest first and capped at [`MAX_VISIT_MARKS`].

use chrono::Utc;
use trellis_shared::constants::MAX_VISIT_MARKS;
use trellis_shared::{PageId, ProjectId, UserId};

use crate::error::{CoreError, Result};
use crate::graph::{Entity, EntityKey, PageSlot, ResourceGraph, Txn};
use crate::manager::Manager;
use crate::models::{Page, VisitMark};
use crate::persist::Persistence;
use crate::sequence::{self, ReorderPlan};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPage {
    pub parent: Option<PageId>,
    pub name: String,
    pub content: String,
}

fn page_siblings(graph: &ResourceGraph, slot: PageSlot) -> Vec<(PageId, u32)> {
    graph
        .pages_in(slot)
        .into_iter()
        .map(|p| (p.id, p.serial_number))
        .collect()
}

fn apply_page_plan(txn: &mut Txn<'_>, plan: &ReorderPlan<PageId>) -> Result<()> {
    for shift in plan.shifts() {
        txn.update_page(shift.id, |p| p.serial_number = shift.to)?;
    }
    Ok(())
}

/// Every page below `page`, each listed after its parent.
fn descendants(graph: &ResourceGraph, page: PageId) -> Vec<PageId> {
    let mut found = Vec::new();
    let mut worklist = vec![page];
    while let Some(current) = worklist.pop() {
        for child in graph.children(current) {
            // A corrupted parent chain must not loop forever.
            if child.id == page || found.contains(&child.id) {
                continue;
            }
            found.push(child.id);
            worklist.push(child.id);
        }
    }
    found
}

/// Drop every document connector that points at `page`.
fn strip_document_connectors(txn: &mut Txn<'_>, project: ProjectId, page: PageId) -> Result<()> {
    let holders: Vec<_> = txn
        .graph()
        .roles_of(project)
        .filter(|r| r.document_connector(page).is_some())
        .map(|r| r.id)
        .collect();
    for role in holders {
        txn.update_role(role, |r| r.document_connectors.retain(|c| c.page != page))?;
    }
    Ok(())
}

/// Point `page` at `new_root` and every descendant at the tree's new root.
fn reroot(txn: &mut Txn<'_>, page: PageId, new_root: Option<PageId>) -> Result<()> {
    let subtree_root = new_root.unwrap_or(page);
    let subtree = descendants(txn.graph(), page);
    txn.update_page(page, |p| p.root = new_root)?;
    for id in subtree {
        if txn.graph().page(id)?.root != Some(subtree_root) {
            txn.update_page(id, |p| p.root = Some(subtree_root))?;
        }
    }
    Ok(())
}

fn visit_siblings(graph: &ResourceGraph, user: UserId) -> Vec<(PageId, u32)> {
    graph
        .visits_of(user)
        .into_iter()
        .map(|m| (m.page, m.serial_number))
        .collect()
}

fn apply_visit_plan(txn: &mut Txn<'_>, user: UserId, plan: &ReorderPlan<PageId>) -> Result<()> {
    for shift in plan.shifts() {
        let mut mark = txn.graph().visit_mark(user, shift.id)?.clone();
        mark.serial_number = shift.to;
        txn.put(Entity::VisitMark(mark));
    }
    Ok(())
}

/// Move `page` to the front of the user's visit marks, dropping the oldest
/// marks past the cap.
fn record_visit(txn: &mut Txn<'_>, user: UserId, page: PageId) -> Result<()> {
    let siblings = visit_siblings(txn.graph(), user);
    let plan = if siblings.iter().any(|(id, _)| *id == page) {
        sequence::plan_move(&siblings, page, 0)?
    } else {
        sequence::plan_insert(&siblings, 0)?
    };
    apply_visit_plan(txn, user, &plan)?;
    txn.put(Entity::VisitMark(VisitMark {
        user,
        page,
        serial_number: 0,
        visited_at: Utc::now(),
    }));

    let evicted: Vec<PageId> = txn
        .graph()
        .visits_of(user)
        .into_iter()
        .filter(|m| m.serial_number as usize >= MAX_VISIT_MARKS)
        .map(|m| m.page)
        .collect();
    for page in evicted {
        txn.delete(EntityKey::VisitMark(user, page));
    }
    Ok(())
}

/// Remove every visit mark on `page`, closing the gap in each visitor's list.
fn forget_visits(txn: &mut Txn<'_>, page: PageId) -> Result<()> {
    let visitors: Vec<UserId> = txn.graph().visitors_of(page).collect();
    for user in visitors {
        let plan = sequence::plan_remove(&visit_siblings(txn.graph(), user), page)?;
        txn.delete(EntityKey::VisitMark(user, page));
        apply_visit_plan(txn, user, &plan)?;
    }
    Ok(())
}

/// Latest first; equal timestamps fall back to the name.
fn by_update_time(pages: &mut [&Page]) {
    pages.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}

impl<P: Persistence> Manager<P> {
    pub fn create_page(&mut self, login: &str, project: ProjectId, new: NewPage) -> Result<Option<Page>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        let parent = match new.parent {
            Some(id) => {
                let parent = self.graph().page(id)?;
                if parent.project != project {
                    return Err(CoreError::InvalidArgument(format!(
                        "page {id} belongs to another project"
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        let access = self.graph().permissions();
        let allowed = access.can_edit_resources(project, user)
            && parent.map(|p| access.can_edit_page(p.id, user)).unwrap_or(true);
        if !allowed {
            Self::denied("create_page", user);
            return Ok(None);
        }

        let slot = match parent {
            Some(p) => PageSlot::Under(p.id),
            None => PageSlot::Top(project),
        };
        let now = Utc::now();
        let page = Page {
            id: PageId::new(),
            project,
            owner: user,
            parent: parent.map(|p| p.id),
            root: parent.map(|p| p.access_root()),
            serial_number: sequence::next_serial(&page_siblings(self.graph(), slot)),
            name: new.name.trim().to_string(),
            published: false,
            content: new.content,
            created_at: now,
            updated_at: now,
        };
        let created = page.clone();
        self.transact("create_page", |txn| {
            txn.put(Entity::Page(created));
            Ok(())
        })?;
        Ok(Some(page))
    }

    /// Move a page to index `to` under `new_parent`, or to the project's top
    /// level when `new_parent` is `None`.
    pub fn transport_page(
        &mut self,
        login: &str,
        page: PageId,
        new_parent: Option<PageId>,
        to: u32,
    ) -> Result<bool> {
        let user = self.principal(login)?;
        let moved = self.graph().page(page)?.clone();
        let parent = match new_parent {
            Some(id) => Some(self.graph().page(id)?.clone()),
            None => None,
        };

        let access = self.graph().permissions();
        let allowed = access.can_mutate_page(page, user)
            && parent.as_ref().map(|p| access.can_edit_page(p.id, user)).unwrap_or(true);
        if !allowed {
            Self::denied("transport_page", user);
            return Ok(false);
        }

        if let Some(parent) = &parent {
            if parent.project != moved.project {
                return Err(CoreError::InvalidArgument(format!(
                    "page {} belongs to another project",
                    parent.id
                )));
            }
            if parent.id == page || descendants(self.graph(), page).contains(&parent.id) {
                return Err(CoreError::InvalidArgument(format!(
                    "page {page} cannot be moved under its own subtree"
                )));
            }
        }

        let source = PageSlot::of(&moved);
        let dest = match &parent {
            Some(p) => PageSlot::Under(p.id),
            None => PageSlot::Top(moved.project),
        };

        if source == dest {
            let plan = sequence::plan_move(&page_siblings(self.graph(), source), page, to)?;
            self.transact("transport_page", |txn| apply_page_plan(txn, &plan))?;
            return Ok(true);
        }

        let removal = sequence::plan_remove(&page_siblings(self.graph(), source), page)?;
        let insertion = sequence::plan_insert(&page_siblings(self.graph(), dest), to)?;
        let new_root = parent.as_ref().map(|p| p.access_root());
        let was_root = moved.is_root();

        self.transact("transport_page", |txn| {
            apply_page_plan(txn, &removal)?;
            apply_page_plan(txn, &insertion)?;
            txn.update_page(page, |p| {
                p.parent = new_parent;
                p.serial_number = to;
                p.updated_at = Utc::now();
            })?;
            reroot(txn, page, new_root)?;
            if was_root && new_parent.is_some() {
                strip_document_connectors(txn, moved.project, page)?;
            }
            Ok(())
        })?;
        Ok(true)
    }

    /// Delete a page together with its whole subtree.
    pub fn delete_page(&mut self, login: &str, page: PageId) -> Result<bool> {
        let user = self.principal(login)?;
        let deleted = self.graph().page(page)?.clone();
        if !self.graph().permissions().can_delete_page(page, user) {
            Self::denied("delete_page", user);
            return Ok(false);
        }

        let gap = sequence::plan_remove(&page_siblings(self.graph(), PageSlot::of(&deleted)), page)?;
        let subtree = descendants(self.graph(), page);

        self.transact("delete_page", |txn| {
            for id in subtree.iter().rev() {
                txn.delete(EntityKey::Page(*id));
            }
            txn.delete(EntityKey::Page(page));
            for id in subtree.iter().chain(std::iter::once(&page)) {
                forget_visits(txn, *id)?;
            }
            if deleted.is_root() {
                strip_document_connectors(txn, deleted.project, page)?;
            }
            apply_page_plan(txn, &gap)
        })?;
        Ok(true)
    }

    /// Set the published flag. Only the owner may do this.
    pub fn publish_page(&mut self, login: &str, page: PageId, published: bool) -> Result<bool> {
        let user = self.principal(login)?;
        if self.graph().page(page)?.owner != user {
            Self::denied("publish_page", user);
            return Ok(false);
        }

        self.transact("publish_page", |txn| {
            txn.update_page(page, |p| {
                p.published = published;
                p.updated_at = Utc::now();
            })
        })?;
        Ok(true)
    }

    pub fn rename_page(&mut self, login: &str, page: PageId, name: &str) -> Result<bool> {
        let user = self.principal(login)?;
        self.graph().page(page)?;
        if !self.graph().permissions().can_mutate_page(page, user) {
            Self::denied("rename_page", user);
            return Ok(false);
        }

        let name = name.trim().to_string();
        self.transact("rename_page", |txn| {
            txn.update_page(page, |p| {
                p.name = name;
                p.updated_at = Utc::now();
            })
        })?;
        Ok(true)
    }

    pub fn set_page_content(&mut self, login: &str, page: PageId, content: String) -> Result<bool> {
        let user = self.principal(login)?;
        self.graph().page(page)?;
        if !self.graph().permissions().can_mutate_page(page, user) {
            Self::denied("set_page_content", user);
            return Ok(false);
        }

        self.transact("set_page_content", |txn| {
            txn.update_page(page, |p| {
                p.content = content;
                p.updated_at = Utc::now();
            })
        })?;
        Ok(true)
    }

    /// Open a page. A successful read also records a visit mark.
    pub fn find_page(&mut self, login: &str, page: PageId) -> Result<Option<Page>> {
        let user = self.principal(login)?;
        let found = self.graph().page(page)?.clone();
        if !self.graph().permissions().can_read_page(page, user) {
            Self::denied("find_page", user);
            return Ok(None);
        }

        self.transact("find_page", |txn| record_visit(txn, user, page))?;
        Ok(Some(found))
    }

    /// Children of a page the caller owns or that are published.
    pub fn find_subpages(&self, login: &str, page: PageId) -> Result<Option<Vec<Page>>> {
        let user = self.principal(login)?;
        self.graph().page(page)?;
        if !self.graph().permissions().can_see_page(page, user) {
            Self::denied("find_subpages", user);
            return Ok(None);
        }

        Ok(Some(
            self.graph()
                .children(page)
                .into_iter()
                .filter(|p| p.owner == user || p.published)
                .cloned()
                .collect(),
        ))
    }

    /// Pages of a project whose name contains `query`, ignoring case,
    /// latest update first.
    pub fn find_pages_by_name(&self, login: &str, project: ProjectId, query: &str) -> Result<Option<Vec<Page>>> {
        let needle = query.trim().to_lowercase();
        let Some(mut pages) = self.readable_pages(login, project, "find_pages_by_name")? else {
            return Ok(None);
        };
        pages.retain(|p| p.name.to_lowercase().contains(&needle));
        Ok(Some(pages.into_iter().cloned().collect()))
    }

    /// Every page of a project the caller may read, latest update first.
    pub fn find_pages_sorted(&self, login: &str, project: ProjectId) -> Result<Option<Vec<Page>>> {
        Ok(self
            .readable_pages(login, project, "find_pages_sorted")?
            .map(|pages| pages.into_iter().cloned().collect()))
    }

    /// Pages of a project the caller opened recently, latest visit first.
    pub fn find_last_seen_pages(&self, login: &str, project: ProjectId) -> Result<Option<Vec<Page>>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        let access = self.graph().permissions();
        if !access.is_member(project, user) {
            Self::denied("find_last_seen_pages", user);
            return Ok(None);
        }

        Ok(Some(
            self.graph()
                .visits_of(user)
                .into_iter()
                .filter_map(|mark| self.graph().page(mark.page).ok())
                .filter(|p| p.project == project && access.can_read_page(p.id, user))
                .cloned()
                .collect(),
        ))
    }

    fn readable_pages(&self, login: &str, project: ProjectId, action: &'static str) -> Result<Option<Vec<&Page>>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        let access = self.graph().permissions();
        if !access.is_member(project, user) {
            Self::denied(action, user);
            return Ok(None);
        }

        let mut pages: Vec<&Page> = self
            .graph()
            .pages_of(project)
            .filter(|p| access.can_read_page(p.id, user))
            .collect();
        by_update_time(&mut pages);
        Ok(Some(pages))
    }

    /// Top-level pages of a project visible to the caller.
    pub fn find_root_pages(&self, login: &str, project: ProjectId) -> Result<Option<Vec<Page>>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        let access = self.graph().permissions();
        if !access.is_member(project, user) {
            Self::denied("find_root_pages", user);
            return Ok(None);
        }

        Ok(Some(
            self.graph()
                .pages_in(PageSlot::Top(project))
                .into_iter()
                .filter(|p| access.can_read_page(p.id, user))
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use trellis_shared::ProjectRole;

    use super::*;
    use crate::audit;
    use crate::fixtures::Fixture;

    fn roots(manager: &Manager<crate::persist::MemoryJournal>, ids: &[PageId]) -> Vec<Option<PageId>> {
        ids.iter()
            .map(|id| manager.graph().page(*id).unwrap().root)
            .collect()
    }

    #[test]
    fn create_appends_and_computes_root() {
        let mut fx = Fixture::new();
        let project = fx.project;
        let mut manager = fx.manager();

        let root = manager
            .create_page("admin", project, NewPage { name: "Handbook".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        let child = manager
            .create_page("admin", project, NewPage { parent: Some(root.id), name: "Intro".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        let grandchild = manager
            .create_page("admin", project, NewPage { parent: Some(child.id), name: "FAQ".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        let second = manager
            .create_page("admin", project, NewPage { parent: Some(root.id), name: "Setup".into(), ..Default::default() })
            .unwrap()
            .unwrap();

        assert_eq!(root.root, None);
        assert_eq!(child.root, Some(root.id));
        assert_eq!(grandchild.root, Some(root.id));
        assert_eq!(second.serial_number, 1);
        assert!(!child.published);
        assert!(audit::verify(manager.graph()).is_empty());
    }

    #[test]
    fn standard_user_cannot_create_pages() {
        let mut fx = Fixture::new();
        fx.member("sam", ProjectRole::StandardUser);
        let project = fx.project;
        let mut manager = fx.manager();
        assert!(manager
            .create_page("sam", project, NewPage { name: "x".into(), ..Default::default() })
            .unwrap()
            .is_none());
    }

    #[test]
    fn moving_between_trees_rewrites_roots() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let r = fx.page("R", None, admin, true);
        let c = fx.page("C", Some(r), admin, true);
        let g = fx.page("G", Some(c), admin, true);
        let s = fx.page("S", None, admin, true);
        let mut manager = fx.manager();

        assert!(manager.transport_page("admin", c, Some(s), 0).unwrap());
        assert_eq!(roots(&manager, &[c, g]), vec![Some(s), Some(s)]);
        assert!(manager.graph().children(r).is_empty());

        assert!(manager.transport_page("admin", c, None, 0).unwrap());
        assert_eq!(roots(&manager, &[c, g]), vec![None, Some(c)]);
        let project = manager.graph().page(c).unwrap().project;
        let top: Vec<PageId> = manager
            .graph()
            .pages_in(PageSlot::Top(project))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(top, vec![c, r, s]);
        assert!(audit::verify(manager.graph()).is_empty());
    }

    #[test]
    fn root_moved_into_a_tree_loses_connectors() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let r = fx.page("R", None, admin, true);
        let x = fx.page("X", None, admin, true);
        let y = fx.page("Y", Some(x), admin, true);
        let role = fx.role("writers", false, &[], &[(x, true), (r, false)]);
        let mut manager = fx.manager();

        assert!(manager.transport_page("admin", x, Some(r), 0).unwrap());
        let role = manager.graph().role(role).unwrap();
        assert!(role.document_connector(x).is_none());
        assert!(role.document_connector(r).is_some());
        assert_eq!(roots(&manager, &[x, y]), vec![Some(r), Some(r)]);
    }

    #[test]
    fn cannot_move_under_own_subtree() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let r = fx.page("R", None, admin, true);
        let c = fx.page("C", Some(r), admin, true);
        let g = fx.page("G", Some(c), admin, true);
        let mut manager = fx.manager();

        assert!(matches!(
            manager.transport_page("admin", r, Some(g), 0),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.transport_page("admin", c, Some(c), 0),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(manager.persistence().commits().is_empty());
    }

    #[test]
    fn reorder_siblings_and_range_check() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let r = fx.page("R", None, admin, true);
        let a = fx.page("A", Some(r), admin, true);
        let b = fx.page("B", Some(r), admin, true);
        let mut manager = fx.manager();

        assert!(manager.transport_page("admin", b, Some(r), 0).unwrap());
        let order: Vec<PageId> = manager.graph().children(r).iter().map(|p| p.id).collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(
            manager.transport_page("admin", b, Some(r), 2),
            Err(CoreError::OutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn delete_cascades_and_closes_gap() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let r = fx.page("R", None, admin, true);
        let c = fx.page("C", Some(r), admin, true);
        fx.page("G", Some(c), admin, true);
        let s = fx.page("S", None, admin, true);
        let role = fx.role("readers", false, &[], &[(r, false), (s, false)]);
        let mut manager = fx.manager();

        assert!(manager.delete_page("admin", r).unwrap());
        assert_eq!(manager.graph().pages().count(), 1);
        assert_eq!(manager.graph().page(s).unwrap().serial_number, 0);
        let role = manager.graph().role(role).unwrap();
        assert_eq!(role.document_connectors.len(), 1);
        assert!(audit::verify(manager.graph()).is_empty());

        let commit = manager.persistence().last_commit().unwrap();
        assert_eq!(commit.deletes().len(), 3);
    }

    #[test]
    fn deletion_requires_all_three_conditions() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let published = fx.page("Published", None, admin, true);
        let draft = fx.page("Draft", None, admin, false);
        let role = fx.role("editors", true, &[], &[(published, true), (draft, true)]);
        let editor = fx.member("ed", ProjectRole::Custom(role));
        let own = fx.page("Own", Some(draft), editor, false);
        fx.member("sam", ProjectRole::StandardUser);
        let mut manager = fx.manager();

        assert!(!manager.delete_page("sam", published).unwrap(), "no resource rights");
        assert!(!manager.delete_page("ed", draft).unwrap(), "neither owner nor pipeline");
        assert!(manager.delete_page("ed", own).unwrap(), "owner of an unpublished page");
        assert!(manager.delete_page("ed", published).unwrap(), "published pipeline");
    }

    #[test]
    fn only_owner_publishes() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let sam = fx.member("sam", ProjectRole::StandardUser);
        let page = fx.page("Notes", None, sam, false);
        let mut manager = fx.manager();

        assert!(!manager.publish_page("admin", page, true).unwrap());
        assert!(manager.find_page("admin", page).unwrap().is_none());
        assert!(manager.publish_page("sam", page, true).unwrap());
        assert!(manager.find_page("admin", page).unwrap().is_some());
        assert!(manager.rename_page("admin", page, " Team notes ").unwrap());
        assert_eq!(manager.graph().page(page).unwrap().name, "Team notes");
        assert_ne!(manager.graph().page(page).unwrap().owner, admin);
    }

    #[test]
    fn listings_hide_foreign_drafts() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let sam = fx.member("sam", ProjectRole::StandardUser);
        let root = fx.page("Root", None, admin, true);
        let hidden_root = fx.page("Hidden", None, admin, true);
        fx.page("Draft", Some(root), admin, false);
        let mine = fx.page("Mine", Some(root), sam, false);
        let shared = fx.page("Shared", Some(root), admin, true);
        let role = fx.role("readers", false, &[], &[(root, false)]);
        fx.member("rita", ProjectRole::Custom(role));
        let project = fx.project;
        let manager = fx.manager();

        let subpages: Vec<PageId> = manager
            .find_subpages("sam", root)
            .unwrap()
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(subpages, vec![mine, shared]);

        let roots: Vec<PageId> = manager
            .find_root_pages("rita", project)
            .unwrap()
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(roots, vec![root]);
        assert_eq!(manager.find_root_pages("sam", project).unwrap().unwrap().len(), 2);
        assert!(manager.find_subpages("rita", hidden_root).unwrap().is_none());
    }

    fn touch(fx: &mut Fixture, page: PageId, minutes_ago: i64) {
        let mut touched = fx.graph.page(page).unwrap().clone();
        touched.updated_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
        fx.graph.upsert(Entity::Page(touched));
    }

    fn ids(pages: Option<Vec<Page>>) -> Vec<PageId> {
        pages.unwrap().into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn search_and_sort_follow_read_access() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let guide = fx.page("Guide", None, admin, true);
        let setup = fx.page("Setup guide", Some(guide), admin, true);
        let draft = fx.page("Guide draft", Some(guide), admin, false);
        let other = fx.page("Other", None, admin, true);
        touch(&mut fx, guide, 30);
        touch(&mut fx, setup, 10);
        touch(&mut fx, draft, 5);
        touch(&mut fx, other, 20);
        let role = fx.role("readers", false, &[], &[(guide, false)]);
        fx.member("rita", ProjectRole::Custom(role));
        fx.user("stranger");
        let project = fx.project;
        let manager = fx.manager();

        assert_eq!(
            ids(manager.find_pages_by_name("admin", project, " GUIDE ").unwrap()),
            vec![draft, setup, guide]
        );
        assert_eq!(
            ids(manager.find_pages_by_name("rita", project, "guide").unwrap()),
            vec![setup, guide]
        );
        assert_eq!(
            ids(manager.find_pages_sorted("admin", project).unwrap()),
            vec![draft, setup, other, guide]
        );
        assert_eq!(
            ids(manager.find_pages_sorted("rita", project).unwrap()),
            vec![setup, guide]
        );
        assert!(manager.find_pages_sorted("stranger", project).unwrap().is_none());
    }

    #[test]
    fn reading_pages_records_recent_visits() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let a = fx.page("A", None, admin, true);
        let b = fx.page("B", None, admin, true);
        let c = fx.page("C", Some(a), admin, true);
        let hidden = fx.page("Hidden", None, admin, false);
        fx.member("sam", ProjectRole::StandardUser);
        let project = fx.project;
        let mut manager = fx.manager();

        for page in [a, b, c, a] {
            manager.find_page("sam", page).unwrap().unwrap();
        }
        assert!(manager.find_page("sam", hidden).unwrap().is_none());
        assert_eq!(ids(manager.find_last_seen_pages("sam", project).unwrap()), vec![a, c, b]);

        let sam = manager.graph().user_by_username("sam").unwrap().id;
        let serials: Vec<u32> = manager.graph().visits_of(sam).iter().map(|m| m.serial_number).collect();
        assert_eq!(serials, vec![0, 1, 2]);

        assert!(manager.delete_page("admin", a).unwrap());
        assert_eq!(ids(manager.find_last_seen_pages("sam", project).unwrap()), vec![b]);
        assert_eq!(manager.graph().visits_of(sam)[0].serial_number, 0);
        assert!(audit::verify(manager.graph()).is_empty());
    }

    #[test]
    fn visit_marks_are_capped() {
        let mut fx = Fixture::new();
        let admin = fx.admin;
        let pages: Vec<PageId> = (0..=MAX_VISIT_MARKS)
            .map(|i| fx.page(&format!("P{i}"), None, admin, true))
            .collect();
        let project = fx.project;
        let mut manager = fx.manager();

        for page in &pages {
            manager.find_page("admin", *page).unwrap().unwrap();
        }
        let seen = ids(manager.find_last_seen_pages("admin", project).unwrap());
        assert_eq!(seen.len(), MAX_VISIT_MARKS);
        assert_eq!(seen[0], pages[MAX_VISIT_MARKS]);
        assert!(!seen.contains(&pages[0]));
    }
}
