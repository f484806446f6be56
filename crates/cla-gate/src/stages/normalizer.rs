use cla_gate_types::{MergeActivityInput, MergeRequestEvent};

use crate::error::GateError;

/// Build the canonical input from a "merge opened" delivery.
pub fn normalize_merge_opened(event: &MergeRequestEvent) -> MergeActivityInput {
    MergeActivityInput {
        project_name: event.project.name.clone(),
        project_path: event.project.path_with_namespace.clone(),
        project_namespace: event.project.namespace.clone(),
        project_external_id: event.project.id,
        merge_request_id: event.object_attributes.iid,
        repository_path: event.project.path_with_namespace.clone(),
        last_commit_sha: event.object_attributes.last_commit_sha().to_string(),
        author_username: None,
        author_email: None,
    }
}

/// Build the canonical input from a "merge comment" delivery.
///
/// Comment payloads carry no merge-request IID; it is taken from the last
/// segment of the comment URL.
pub fn normalize_merge_comment(event: &MergeRequestEvent) -> Result<MergeActivityInput, GateError> {
    let merge_request_id = merge_request_id_from_url(&event.object_attributes.url)?;
    let user = event.user.as_ref();

    Ok(MergeActivityInput {
        project_name: event.project.name.clone(),
        project_path: event.project.path_with_namespace.clone(),
        project_namespace: event.project.namespace.clone(),
        project_external_id: event.project.id,
        merge_request_id,
        repository_path: event.project.path_with_namespace.clone(),
        last_commit_sha: event.object_attributes.last_commit_sha().to_string(),
        author_username: user
            .map(|u| u.username.clone())
            .filter(|u| !u.is_empty()),
        author_email: user
            .and_then(|u| u.email.clone())
            .filter(|e| !e.is_empty()),
    })
}

/// `https://host/group/project/-/merge_requests/42#note_7` -> `42`
pub fn merge_request_id_from_url(url: &str) -> Result<u64, GateError> {
    let malformed = || GateError::MalformedCommentUrl {
        url: url.to_string(),
    };

    let last_segment = url.rsplit('/').next().ok_or_else(malformed)?;
    let id = last_segment.split('#').next().unwrap_or_default();
    if id.is_empty() {
        return Err(malformed());
    }
    id.parse::<u64>().map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cla_gate_types::{EventCommit, EventObjectAttributes, EventProject, EventUser};

    fn event(url: &str, sha: Option<&str>) -> MergeRequestEvent {
        MergeRequestEvent {
            project: EventProject {
                id: 17,
                name: "widgets".into(),
                path_with_namespace: "acme/widgets".into(),
                namespace: "Acme".into(),
            },
            object_attributes: EventObjectAttributes {
                iid: 9,
                url: url.into(),
                last_commit: sha.map(|id| EventCommit { id: id.into() }),
            },
            user: Some(EventUser {
                username: "alice".into(),
                email: Some("alice@example.com".into()),
            }),
        }
    }

    #[test]
    fn opened_event_copies_fields() {
        let input = normalize_merge_opened(&event("", Some("abc")));
        assert_eq!(input.project_external_id, 17);
        assert_eq!(input.merge_request_id, 9);
        assert_eq!(input.repository_path, "acme/widgets");
        assert_eq!(input.project_namespace, "Acme");
        assert_eq!(input.last_commit_sha, "abc");
        assert!(input.author_username.is_none());
    }

    #[test]
    fn comment_event_parses_id_from_url() {
        let input = normalize_merge_comment(&event(
            "https://gitlab.com/acme/widgets/-/merge_requests/42#note_7",
            None,
        ))
        .unwrap();
        assert_eq!(input.merge_request_id, 42);
        assert_eq!(input.last_commit_sha, "");
        assert_eq!(input.author_username.as_deref(), Some("alice"));
        assert_eq!(input.author_email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn url_without_fragment_is_accepted() {
        assert_eq!(
            merge_request_id_from_url("https://gitlab.com/a/b/-/merge_requests/5").unwrap(),
            5
        );
    }

    #[test]
    fn non_integer_segment_is_rejected() {
        for url in [
            "https://gitlab.com/a/b/-/merge_requests/",
            "https://gitlab.com/a/b/-/merge_requests/abc#note_1",
            "",
        ] {
            let err = merge_request_id_from_url(url).unwrap_err();
            assert!(matches!(err, GateError::MalformedCommentUrl { .. }), "{url}");
        }
    }
}
