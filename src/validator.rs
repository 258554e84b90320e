//! Reference publishability checks.

use crate::xrefmap::XrefMapReference;

/// `commentId` prefix of the synthetic references DocFX emits for a group of
/// overloads. They have no page of their own on the Unity documentation.
pub const OVERLOAD_MARKER: &str = "Overload:";

/// Whether `reference` may be published in an xref map.
pub fn is_valid(reference: &XrefMapReference) -> bool {
    !reference.comment_id.contains(OVERLOAD_MARKER)
}

/// Member path of an overload group or member comment id, without the kind
/// prefix, parameter list and overload wildcard.
///
/// `Overload:UnityEngine.Object.Destroy*` -> `UnityEngine.Object.Destroy`
/// `M:UnityEngine.Object.Destroy(UnityEngine.Object)` -> `UnityEngine.Object.Destroy`
fn member_path(comment_id: &str) -> Option<&str> {
    let (_, path) = comment_id.split_once(':')?;
    let path = path.split('(').next().unwrap_or(path);
    Some(path.trim_end_matches('*'))
}

/// Rewrite an overload-group reference into a method reference when none of
/// its overloads survived in `all_references`.
///
/// DocFX sometimes keeps the group entry of a member while dropping its
/// concrete overloads. Without a rewrite the member would disappear from the
/// map entirely, so the group takes over as `M:<member path>`.
///
/// Returns `true` when the comment id was rewritten.
pub fn fix_overload_comment_id(
    reference: &mut XrefMapReference,
    all_references: &[XrefMapReference],
) -> bool {
    if is_valid(reference) {
        return false;
    }

    let Some(group_path) = member_path(&reference.comment_id) else {
        return false;
    };

    let has_concrete_member = all_references.iter().any(|other| {
        (other.comment_id.starts_with("M:") || other.comment_id.starts_with("P:"))
            && member_path(&other.comment_id) == Some(group_path)
    });
    if has_concrete_member {
        return false;
    }

    reference.comment_id = format!("M:{}", group_path);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(uid: &str, comment_id: &str) -> XrefMapReference {
        XrefMapReference::new(uid, comment_id)
    }

    #[test]
    fn test_overload_groups_are_invalid() {
        assert!(!is_valid(&reference(
            "UnityEngine.Object.Destroy*",
            "Overload:UnityEngine.Object.Destroy"
        )));
        assert!(is_valid(&reference(
            "UnityEngine.Object.Destroy(UnityEngine.Object)",
            "M:UnityEngine.Object.Destroy(UnityEngine.Object)"
        )));
        assert!(is_valid(&reference("UnityEngine", "N:UnityEngine")));
    }

    #[test]
    fn test_fix_overload_keeps_group_with_members() {
        let members = vec![
            reference(
                "UnityEngine.Object.Destroy(UnityEngine.Object)",
                "M:UnityEngine.Object.Destroy(UnityEngine.Object)",
            ),
            reference(
                "UnityEngine.Object.Destroy*",
                "Overload:UnityEngine.Object.Destroy",
            ),
        ];

        let mut group = members[1].clone();
        assert!(!fix_overload_comment_id(&mut group, &members));
        assert_eq!(group.comment_id, "Overload:UnityEngine.Object.Destroy");
    }

    #[test]
    fn test_fix_overload_rescues_orphan_group() {
        let members = vec![reference(
            "UnityEngine.Object.Instantiate*",
            "Overload:UnityEngine.Object.Instantiate",
        )];

        let mut group = members[0].clone();
        assert!(fix_overload_comment_id(&mut group, &members));
        assert_eq!(group.comment_id, "M:UnityEngine.Object.Instantiate");
        assert!(is_valid(&group));
    }

    #[test]
    fn test_fix_overload_ignores_valid_references() {
        let mut method = reference("UnityEngine.Object.#ctor", "M:UnityEngine.Object.#ctor");
        assert!(!fix_overload_comment_id(&mut method, &[]));
        assert_eq!(method.comment_id, "M:UnityEngine.Object.#ctor");
    }
}
