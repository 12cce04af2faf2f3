// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph fixture builders shared by the test suites of the higher crates.

use magpie_core::{
    Collection, CollectionKey, Group, GroupKey, OwnerKey, Project, ProjectKey, Record, RecordKey,
    Repo, RepoKey, User, UserKey,
};

use crate::graph::Graph;

pub fn user(graph: &mut Graph, id: &str) -> UserKey {
    let key = UserKey::new(id);
    graph.insert_user(User::new(key.clone(), id));
    key
}

pub fn group(graph: &mut Graph, id: &str, owner: &UserKey, members: &[&UserKey]) -> GroupKey {
    let key = GroupKey::new(id);
    graph.insert_group(Group::new(key.clone(), id));
    graph.set_owner(key.clone(), OwnerKey::User(owner.clone()));
    for member in members {
        graph.add_member(key.clone(), (*member).clone());
    }
    key
}

pub fn project(graph: &mut Graph, id: &str, owner: &UserKey) -> ProjectKey {
    let key = ProjectKey::new(id);
    graph.insert_project(Project::new(key.clone(), id));
    graph.set_owner(key.clone(), OwnerKey::User(owner.clone()));
    key
}

pub fn record(graph: &mut Graph, id: &str, owner: impl Into<OwnerKey>) -> RecordKey {
    let key = RecordKey::new(id);
    graph.insert_record(Record::new(key.clone(), id));
    graph.set_owner(key.clone(), owner.into());
    key
}

pub fn collection(graph: &mut Graph, id: &str, owner: impl Into<OwnerKey>) -> CollectionKey {
    let key = CollectionKey::new(id);
    graph.insert_collection(Collection::new(key.clone(), id));
    graph.set_owner(key.clone(), owner.into());
    key
}

pub fn repo(graph: &mut Graph, id: &str) -> RepoKey {
    let key = RepoKey::new(id);
    graph.insert_repo(Repo::new(key.clone(), id, format!("{}.example.org", id)));
    key
}
