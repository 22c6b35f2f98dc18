//  ITEM.rs
//    by Lut99
//
//  Created:
//    02 Oct 2026, 11:52:10
//  Last edited:
//    06 Oct 2026, 14:20:31
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the `Item<T>` envelope that gives a state or a set of
//!   instructions an identifier when it travels between nodes.
//

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};


/***** LIBRARY *****/
/// Wraps a payload (i.e., a [`State`](crate::state::State) or [`Instructions`](crate::instructions::Instructions)) with an identifier.
///
/// The identifier correlates instructions with the state that is later polled for.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item<T> {
    /// The identifier of this item.
    pub id            : String,
    /// When the item was first created.
    pub created       : DateTime<Utc>,
    /// When the item was last changed.
    pub last_modified : DateTime<Utc>,
    /// The payload itself.
    pub definition    : T,
}

impl<T> Item<T> {
    /// Constructor for the Item.
    ///
    /// # Arguments
    /// - `id`: The identifier of the item.
    /// - `definition`: The payload to wrap.
    ///
    /// # Returns
    /// A new Item with both timestamps set to now.
    #[inline]
    pub fn new(id: impl Into<String>, definition: T) -> Self {
        let now: DateTime<Utc> = Utc::now();
        Self {
            id : id.into(),
            created       : now,
            last_modified : now,
            definition,
        }
    }



    /// Replaces the payload with a new one, bumping the last modified timestamp but keeping the ID and creation time.
    #[inline]
    pub fn with_definition<U>(self, definition: U) -> Item<U> {
        Item {
            id            : self.id,
            created       : self.created,
            last_modified : Utc::now(),
            definition,
        }
    }

    /// Consumes the item into its payload.
    #[inline]
    pub fn into_definition(self) -> T { self.definition }
}
