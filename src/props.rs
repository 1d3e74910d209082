//! This module defines the property arena underlying every container in this crate.
//!
//! Properties are named, typed columns of per-element data. A [`PropertySet`] owns a group of
//! type-erased columns and keeps them synchronized: every column always holds exactly
//! `len()` elements, one per element of the owning container. Elements are added, swapped and
//! resized through the registry so that all columns move in lockstep.
//!
//! Typed access goes through [`Property<T>`] keys handed out when a column is added or looked
//! up. A key remembers its slot, name and element type; it stays valid until its column is
//! removed, surviving removals of unrelated columns.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use dyn_clone::DynClone;

use crate::handle::{PropertyIndex, INVALID_INDEX};

/// A value that can be stored in a property column.
pub trait PropertyValue: Any + Clone + fmt::Debug + Send + Sync {}
impl<T> PropertyValue for T where T: Any + Clone + fmt::Debug + Send + Sync {}

/// Error type specific to property access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Property with the given name already exists.
    AlreadyExists(String),
    /// Property with the given name exists, but stores a different element type.
    TypeMismatch {
        /// The type requested by the caller.
        expected: TypeId,
        /// The type actually stored by the column.
        actual: TypeId,
    },
    /// Property with the given name is not found.
    DoesNotExist(String),
    /// The given key no longer refers to a live column.
    StaleKey(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AlreadyExists(name) => write!(
                f,
                "property \"{}\" already exists, remove it before adding a new one",
                name
            ),
            Error::TypeMismatch { expected, actual } => write!(
                f,
                "type mismatch: expected {:?}, but the property stores {:?}",
                expected, actual
            ),
            Error::DoesNotExist(name) => write!(f, "property \"{}\" does not exist", name),
            Error::StaleKey(name) => write!(
                f,
                "the key for property \"{}\" no longer refers to a live column",
                name
            ),
        }
    }
}

impl std::error::Error for Error {}

/// The type-erased interface of a property column.
///
/// Element values never cross this interface; the registry only drives the lifecycle
/// (grow, shrink, swap, clone) uniformly across columns of different element types.
trait Column: DynClone + fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn len(&self) -> usize;
    fn reserve(&mut self, additional: usize);
    fn resize(&mut self, new_len: usize);
    fn shrink_to_fit(&mut self);
    /// Append one default element.
    fn push(&mut self);
    fn swap(&mut self, i: usize, j: usize);
    fn element_type_id(&self) -> TypeId;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

dyn_clone::clone_trait_object!(Column);

/// A single typed column: a name, a default value for new elements, and the data.
#[derive(Clone, Debug)]
struct PropertyStorage<T> {
    name: String,
    default: T,
    data: Vec<T>,
}

impl<T: PropertyValue> Column for PropertyStorage<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    fn resize(&mut self, new_len: usize) {
        self.data.resize(new_len, self.default.clone());
    }

    fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    fn push(&mut self) {
        self.data.push(self.default.clone());
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(i, j);
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A typed key addressing one column of a [`PropertySet`].
///
/// Keys are cheap to clone and stay valid until their column is removed. Removing an unrelated
/// column leaves a vacant slot behind instead of shifting keys.
#[derive(Clone, Debug)]
pub struct Property<T> {
    slot: PropertyIndex,
    name: String,
    phantom: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    /// The name of the addressed column.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> PartialEq for Property<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.name == other.name
    }
}

/// A synchronized set of property columns for one element kind.
///
/// Each container owns one set per element kind (vertices, halfedges, edges, faces). All
/// lifecycle operations (`push`, `resize`, `swap`, …) broadcast to every live column, which is
/// what keeps user data attached to its element through mutations and garbage collection.
#[derive(Clone, Debug, Default)]
pub struct PropertySet {
    slots: Vec<Option<Box<dyn Column>>>,
    size: usize,
}

impl PropertySet {
    /// Construct an empty property set.
    pub fn new() -> Self {
        PropertySet {
            slots: Vec::new(),
            size: 0,
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.find_col(name).map(|(slot, _)| slot)
    }

    fn find_col(&self, name: &str) -> Option<(usize, &dyn Column)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.as_deref().filter(|c| c.name() == name).map(|c| (i, c)))
    }

    fn column<T: PropertyValue>(&self, prop: &Property<T>) -> Result<&PropertyStorage<T>, Error> {
        let col = self
            .slots
            .get(prop.slot as usize)
            .and_then(|s| s.as_ref())
            .filter(|c| c.name() == prop.name)
            .ok_or_else(|| Error::StaleKey(prop.name.clone()))?;
        col.as_any()
            .downcast_ref::<PropertyStorage<T>>()
            .ok_or_else(|| Error::TypeMismatch {
                expected: TypeId::of::<T>(),
                actual: col.element_type_id(),
            })
    }

    fn column_mut<T: PropertyValue>(
        &mut self,
        prop: &Property<T>,
    ) -> Result<&mut PropertyStorage<T>, Error> {
        let col = self
            .slots
            .get_mut(prop.slot as usize)
            .and_then(|s| s.as_mut())
            .filter(|c| c.name() == prop.name)
            .ok_or_else(|| Error::StaleKey(prop.name.clone()))?;
        let actual = col.element_type_id();
        col.as_any_mut()
            .downcast_mut::<PropertyStorage<T>>()
            .ok_or(Error::TypeMismatch {
                expected: TypeId::of::<T>(),
                actual,
            })
    }

    /// Add a new property with the given name and default value, sized to the current number
    /// of elements.
    pub fn add<T: PropertyValue>(
        &mut self,
        name: impl Into<String>,
        default: T,
    ) -> Result<Property<T>, Error> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(Error::AlreadyExists(name));
        }
        let mut storage = PropertyStorage {
            name: name.clone(),
            default,
            data: Vec::new(),
        };
        storage.data.resize(self.size, storage.default.clone());
        // Reuse the first vacant slot so keys to other columns stay put.
        let slot = match self.slots.iter().position(|s| s.is_none()) {
            Some(slot) => {
                self.slots[slot] = Some(Box::new(storage));
                slot
            }
            None => {
                self.slots.push(Some(Box::new(storage)));
                self.slots.len() - 1
            }
        };
        debug_assert!(slot < INVALID_INDEX as usize);
        Ok(Property {
            slot: slot as PropertyIndex,
            name,
            phantom: PhantomData,
        })
    }

    /// Look up an existing property by name.
    pub fn get<T: PropertyValue>(&self, name: &str) -> Result<Property<T>, Error> {
        let (slot, col) = self
            .find_col(name)
            .ok_or_else(|| Error::DoesNotExist(name.to_string()))?;
        if col.element_type_id() != TypeId::of::<T>() {
            return Err(Error::TypeMismatch {
                expected: TypeId::of::<T>(),
                actual: col.element_type_id(),
            });
        }
        Ok(Property {
            slot: slot as PropertyIndex,
            name: name.to_string(),
            phantom: PhantomData,
        })
    }

    /// Look up a property by name, adding it with the given default if missing.
    pub fn get_or_add<T: PropertyValue>(
        &mut self,
        name: impl Into<String>,
        default: T,
    ) -> Result<Property<T>, Error> {
        let name = name.into();
        match self.get::<T>(&name) {
            Err(Error::DoesNotExist(_)) => self.add(name, default),
            other => other,
        }
    }

    /// Remove the column addressed by the given key.
    ///
    /// Returns `false` if the key is stale or its element type does not match the live column,
    /// in which case nothing is removed.
    pub fn remove<T: PropertyValue>(&mut self, prop: &Property<T>) -> bool {
        if self.column(prop).is_err() {
            return false;
        }
        self.slots[prop.slot as usize] = None;
        true
    }

    /// True if a property with the given name exists.
    #[inline]
    pub fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The names of all live properties.
    pub fn names(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref().map(|c| c.name().to_string()))
            .collect()
    }

    /// The number of live properties.
    pub fn property_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// The number of elements each column holds.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True if there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The values of the addressed column as a slice, one entry per element.
    ///
    /// Panics if the key is stale. Use [`PropertySet::try_slice`] for a fallible lookup.
    #[inline]
    pub fn slice<T: PropertyValue>(&self, prop: &Property<T>) -> &[T] {
        match self.try_slice(prop) {
            Ok(slice) => slice,
            Err(err) => panic!("{}", err),
        }
    }

    /// The values of the addressed column as a mutable slice.
    ///
    /// Panics if the key is stale. Use [`PropertySet::try_slice_mut`] for a fallible lookup.
    #[inline]
    pub fn slice_mut<T: PropertyValue>(&mut self, prop: &Property<T>) -> &mut [T] {
        match self.try_slice_mut(prop) {
            Ok(slice) => slice,
            Err(err) => panic!("{}", err),
        }
    }

    /// Fallible variant of [`PropertySet::slice`].
    pub fn try_slice<T: PropertyValue>(&self, prop: &Property<T>) -> Result<&[T], Error> {
        Ok(&self.column(prop)?.data)
    }

    /// Fallible variant of [`PropertySet::slice_mut`].
    pub fn try_slice_mut<T: PropertyValue>(
        &mut self,
        prop: &Property<T>,
    ) -> Result<&mut [T], Error> {
        Ok(&mut self.column_mut(prop)?.data)
    }

    /// Append one element to every column, filled with each column's default value.
    pub fn push(&mut self) {
        for col in self.slots.iter_mut().flatten() {
            col.push();
        }
        self.size += 1;
    }

    /// Swap elements `i` and `j` in every column.
    pub fn swap_elements(&mut self, i: usize, j: usize) {
        for col in self.slots.iter_mut().flatten() {
            col.swap(i, j);
        }
    }

    /// Reserve capacity for `additional` more elements in every column.
    pub fn reserve(&mut self, additional: usize) {
        for col in self.slots.iter_mut().flatten() {
            col.reserve(additional);
        }
    }

    /// Resize every column to `new_len` elements, filling with defaults on growth.
    pub fn resize(&mut self, new_len: usize) {
        for col in self.slots.iter_mut().flatten() {
            col.resize(new_len);
        }
        self.size = new_len;
    }

    /// Release unused capacity in every column.
    pub fn shrink_to_fit(&mut self) {
        for col in self.slots.iter_mut().flatten() {
            col.shrink_to_fit();
        }
    }

    /// Drop all columns and reset the element count to zero.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.size = 0;
    }
}

macro_rules! impl_element_property {
    ($(#[$attr:meta])* $wrapper:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $wrapper<T>(pub(crate) Property<T>);

        impl<T> $wrapper<T> {
            /// The name of the addressed column.
            #[inline]
            pub fn name(&self) -> &str {
                self.0.name()
            }
        }
    };
}

impl_element_property! {
    /// A typed key for a per-vertex property. Only usable with the container that created it.
    VertexProperty
}

impl_element_property! {
    /// A typed key for a per-halfedge property.
    HalfedgeProperty
}

impl_element_property! {
    /// A typed key for a per-edge property.
    EdgeProperty
}

impl_element_property! {
    /// A typed key for a per-face property.
    FaceProperty
}
