// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of the effective access of a block along one path.
use canvas_core::{AccessType, Block, UserId};

/// Outcome of resolving the access of a block for one specific path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Access governing the block along this path. `Inherited` if nothing on the path resolved to
    /// an absolute setting.
    pub effective: AccessType,

    /// `true` if access could not be proven from the stored settings on this path.
    pub ambiguous: bool,
}

/// Resolve the effective access of a block given what was resolved for its parent on the same
/// path.
///
/// Absolute settings win over whatever was inherited. An `inherited` block takes over the access
/// of the path. If the path itself is still unresolved the block is ambiguous, unless it was
/// directly shared with the user.
///
/// Roots are resolved with `inherited_so_far` set to `Inherited`.
///
/// This does not carry ambiguity down the path, callers need to combine the result with the
/// ambiguity of the parent.
pub fn resolve(block: &Block, inherited_so_far: AccessType, user: &UserId) -> Resolution {
    if block.access_type.is_absolute() {
        return Resolution {
            effective: block.access_type,
            ambiguous: false,
        };
    }

    match inherited_so_far {
        AccessType::Inherited => Resolution {
            effective: AccessType::Inherited,
            ambiguous: !block.is_visible_to(user),
        },
        resolved => Resolution {
            effective: resolved,
            ambiguous: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use canvas_core::{AccessType, Block, BlockId, NewBlock, UserId};

    use super::{Resolution, resolve};

    const OWNER: UserId = UserId::new(1);
    const VISITOR: UserId = UserId::new(2);

    fn block(access_type: AccessType) -> Block {
        Block::from_new(
            BlockId::new(1),
            OWNER,
            NewBlock::new().access_type(access_type),
            0,
        )
    }

    #[test]
    fn absolute_access_ignores_path() {
        for access_type in [
            AccessType::Private,
            AccessType::Public,
            AccessType::PublicEditable,
        ] {
            for inherited in [
                AccessType::Private,
                AccessType::Public,
                AccessType::PublicEditable,
                AccessType::Inherited,
            ] {
                assert_eq!(
                    resolve(&block(access_type), inherited, &VISITOR),
                    Resolution {
                        effective: access_type,
                        ambiguous: false,
                    }
                );
            }
        }
    }

    #[test]
    fn inherited_takes_over_path_access() {
        let inherited = block(AccessType::Inherited);

        assert_eq!(
            resolve(&inherited, AccessType::Private, &VISITOR),
            Resolution {
                effective: AccessType::Private,
                ambiguous: false,
            }
        );
        assert_eq!(
            resolve(&inherited, AccessType::Public, &VISITOR).effective,
            AccessType::Public
        );
    }

    #[test]
    fn unresolved_path_is_ambiguous_without_direct_grant() {
        let inherited = block(AccessType::Inherited);

        // Visitor has no direct grant, nothing proves they may see this.
        assert_eq!(
            resolve(&inherited, AccessType::Inherited, &VISITOR),
            Resolution {
                effective: AccessType::Inherited,
                ambiguous: true,
            }
        );

        // The owner was granted access directly when creating the block.
        assert_eq!(
            resolve(&inherited, AccessType::Inherited, &OWNER),
            Resolution {
                effective: AccessType::Inherited,
                ambiguous: false,
            }
        );
    }
}
