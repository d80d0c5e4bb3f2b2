use std::{
    any::{type_name, Any, TypeId},
    cell::{Ref, RefCell, RefMut},
    marker::PhantomData,
    ops::{Deref, DerefMut, Index, IndexMut},
    rc::Rc,
};

use crate::{
    element::{Handle, EH, FH, HH, MH, VH},
    error::Error,
};

/// Types that can be stored as property values.
pub trait TPropData: Clone + 'static {}

impl<T> TPropData for T where T: Clone + 'static {}

/// Named, type erased columns of values, one column per property. Every
/// column has exactly `len()` values, one per element of kind `H`. Structural
/// operations are applied to all columns together: either every column is
/// updated or, if any column is currently borrowed, none of them is.
pub(crate) struct PropertyContainer<H>
where
    H: Handle,
{
    props: Vec<Box<dyn GenericProperty<H>>>,
    length: usize,
}

impl<H> Default for PropertyContainer<H>
where
    H: Handle,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PropertyContainer<H>
where
    H: Handle,
{
    pub fn new_with_size(length: usize) -> Self {
        PropertyContainer {
            props: Vec::new(),
            length,
        }
    }

    pub fn new() -> Self {
        Self::new_with_size(0)
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.props.iter().position(|prop| prop.name() == name)
    }

    /// Make sure no column is borrowed, so that a structural operation can be
    /// applied to all of them without failing halfway.
    pub fn check_borrows(&self) -> Result<(), Error> {
        for prop in self.props.iter() {
            prop.check_borrow()?;
        }
        Ok(())
    }

    /// Add a column named `name` filled with `default`. If a column with the
    /// same name and type exists, that column is returned instead.
    pub fn add<T: TPropData>(&mut self, name: &str, default: T) -> Result<Property<H, T>, Error> {
        match self.find(name) {
            Some(i) => match self.props[i].as_any().downcast_ref::<Column<H, T>>() {
                Some(col) => Ok(col.property()),
                None => Err(Error::DuplicateName(name.to_string())),
            },
            None => Ok(self.create(name, default)),
        }
    }

    /// Add a column without looking for an existing column with the same
    /// name. Only for names known to be unused.
    pub fn create<T: TPropData>(&mut self, name: &str, default: T) -> Property<H, T> {
        debug_assert!(self.find(name).is_none());
        let col = Column {
            name: name.to_string(),
            data: Rc::new(RefCell::new(PropBuf {
                buf: vec![default.clone(); self.length],
                _phantom: PhantomData,
            })),
            default,
        };
        let prop = col.property();
        self.props.push(Box::new(col));
        prop
    }

    /// Look up the column named `name`. Returns `None` if there is no such
    /// column, and an error if the column stores a type other than `T`.
    pub fn get<T: TPropData>(&self, name: &str) -> Result<Option<Property<H, T>>, Error> {
        let Some(i) = self.find(name) else {
            return Ok(None);
        };
        let prop = &self.props[i];
        match prop.as_any().downcast_ref::<Column<H, T>>() {
            Some(col) => Ok(Some(col.property())),
            None => Err(Error::PropertyTypeMismatch {
                name: name.to_string(),
                stored: prop.type_name(),
                requested: type_name::<T>(),
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        match self.find(name) {
            Some(i) => {
                self.props.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<bool, Error> {
        if old != new && self.find(new).is_some() {
            return Err(Error::DuplicateName(new.to_string()));
        }
        match self.find(old) {
            Some(i) => {
                self.props[i].rename(new);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.props.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn type_name(&self, name: &str) -> Option<&'static str> {
        self.find(name).map(|i| self.props[i].type_name())
    }

    /**
     * Reserve memory to accomodate an additional `n` elements.
     */
    pub fn reserve(&mut self, n: usize) -> Result<(), Error> {
        self.check_borrows()?;
        for prop in self.props.iter_mut() {
            prop.reserve(n)?;
        }
        Ok(())
    }

    pub fn resize(&mut self, n: usize) -> Result<(), Error> {
        self.check_borrows()?;
        for prop in self.props.iter_mut() {
            prop.resize(n)?;
        }
        self.length = n;
        Ok(())
    }

    pub fn shrink_to_fit(&mut self) -> Result<(), Error> {
        self.check_borrows()?;
        for prop in self.props.iter_mut() {
            prop.shrink_to_fit()?;
        }
        Ok(())
    }

    pub fn push_value(&mut self) -> Result<(), Error> {
        self.push_values(1)
    }

    pub fn push_values(&mut self, num: usize) -> Result<(), Error> {
        self.check_borrows()?;
        for prop in self.props.iter_mut() {
            prop.resize(self.length + num)?;
        }
        self.length += num;
        Ok(())
    }

    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), Error> {
        self.check_borrows()?;
        for prop in self.props.iter_mut() {
            prop.swap(i, j)?;
        }
        Ok(())
    }

    pub fn copy(&mut self, src: H, dst: H) -> Result<(), Error> {
        self.check_borrows()?;
        for prop in self.props.iter_mut() {
            prop.copy(src.index() as usize, dst.index() as usize)?;
        }
        Ok(())
    }

    /// Add default filled columns for those that exist in `other` but not in
    /// this container.
    pub fn copy_properties(&mut self, other: &PropertyContainer<H>) {
        for rprop in other.props.iter() {
            if self.find(rprop.name()).is_none() {
                self.props.push(rprop.empty_clone(self.length));
            }
        }
    }

    /// Fails with [`Error::DuplicateName`] if a column of `other` has the same
    /// name as a column of this container, but stores a different type.
    pub fn check_compatible(&self, other: &PropertyContainer<H>) -> Result<(), Error> {
        for prop in self.props.iter() {
            if other
                .props
                .iter()
                .any(|r| r.name() == prop.name() && r.value_type() != prop.value_type())
            {
                return Err(Error::DuplicateName(prop.name().to_string()));
            }
        }
        Ok(())
    }

    /// Copy the values of `other` into the last `other.len()` slots of this
    /// container. Columns are matched by name, and a match with a different
    /// type fails with [`Error::DuplicateName`] before anything is written.
    /// Columns that have no match in `other` keep whatever values they have,
    /// usually the defaults written by a preceding `resize`.
    pub fn transfer(&mut self, other: &PropertyContainer<H>) -> Result<(), Error> {
        if other.length > self.length {
            return Err(Error::MismatchedArrayLengths(self.length, other.length));
        }
        self.check_compatible(other)?;
        self.check_borrows()?;
        other.check_borrows()?;
        for prop in self.props.iter_mut() {
            if let Some(rprop) = other.props.iter().find(|r| r.name() == prop.name()) {
                prop.transfer(rprop.as_ref())?;
            }
        }
        Ok(())
    }

    /// Clone this container. The clone shares no storage with `self`.
    pub fn deep_clone(&self) -> Result<Self, Error> {
        Ok(PropertyContainer {
            props: self
                .props
                .iter()
                .map(|p| p.deep_clone())
                .collect::<Result<Vec<_>, Error>>()?,
            length: self.length,
        })
    }

    pub fn len(&self) -> usize {
        self.length
    }
}

trait GenericProperty<H>
where
    H: Handle,
{
    fn name(&self) -> &str;

    fn rename(&mut self, name: &str);

    fn type_name(&self) -> &'static str;

    fn value_type(&self) -> TypeId;

    fn as_any(&self) -> &dyn Any;

    fn check_borrow(&self) -> Result<(), Error>;

    fn reserve(&mut self, n: usize) -> Result<(), Error>;

    fn resize(&mut self, n: usize) -> Result<(), Error>;

    fn shrink_to_fit(&mut self) -> Result<(), Error>;

    fn swap(&mut self, i: usize, j: usize) -> Result<(), Error>;

    fn copy(&mut self, src: usize, dst: usize) -> Result<(), Error>;

    fn transfer(&mut self, other: &dyn GenericProperty<H>) -> Result<(), Error>;

    fn deep_clone(&self) -> Result<Box<dyn GenericProperty<H>>, Error>;

    fn empty_clone(&self, length: usize) -> Box<dyn GenericProperty<H>>;
}

/// Buffer containing the property values.
///
/// This is meant to be a thin wrapper around `T` that allows for convenient and
/// type safe indexing with the handle type `H`. If you need a raw slice, you
/// can always convert the property buffer into a `&[T]` at zero cost.
///
/// To access this buffer from the property that owns it, you have it borrow it
/// as either [`Ref`](std::cell::Ref) or [`RefMut`](std::cell::RefMut)
pub struct PropBuf<H, T>
where
    H: Handle,
    T: TPropData,
{
    buf: Vec<T>,
    _phantom: PhantomData<H>,
}

/// The element handle can be used to index into the property buffer.
impl<H, T> Index<H> for PropBuf<H, T>
where
    H: Handle,
    T: TPropData,
{
    type Output = T;

    fn index(&self, handle: H) -> &Self::Output {
        &self.buf[handle.index() as usize]
    }
}

/// The element handle can be used to index into the property buffer.
impl<H, T> IndexMut<H> for PropBuf<H, T>
where
    H: Handle,
    T: TPropData,
{
    /// Get the mutable reference to the property of the element corresponding
    /// to handle `h`.
    fn index_mut(&mut self, h: H) -> &mut Self::Output {
        &mut self.buf[h.index() as usize]
    }
}

/// A property buffer can be turned into a `&[T]` for conveninence.
impl<H, T> Deref for PropBuf<H, T>
where
    H: Handle,
    T: TPropData,
{
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

/// A mutable property buffer can be turned into a `&mut [T]` for conveninence.
impl<H, T> DerefMut for PropBuf<H, T>
where
    H: Handle,
    T: TPropData,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

/// This represents a named property defined on the elements of the mesh. `T`
/// is the type of data associated with each element of the mesh, whose handle
/// type is `H`.
///
/// Why use properties instead of simple [`Vec<T>`] to associate values with
/// elements of a mesh? Say you use a simple [`Vec<T>`] to keep track of
/// properties. If you modify the mesh, by either adding new elements (vertices,
/// faces, etc.), or by deleting elements and garbage collecting. The [`Vec<T>`]
/// will go out of sync with the mesh. Instead using a [`Property<H, T>`]
/// guarantees the properties are always synchronized with the mesh, and that
/// every element of the mesh of type `H`, even the newly added ones will have a
/// value associated with it.
///
/// A property is a shared reference to a column owned by the mesh. Cloning it
/// is cheap. Once the column is removed from the mesh, the property still
/// holds the last values but is no longer kept in sync.
#[derive(Clone)]
pub struct Property<H, T>
where
    H: Handle,
    T: TPropData,
{
    data: Rc<RefCell<PropBuf<H, T>>>,
    default: T,
}

impl<H, T> Property<H, T>
where
    H: Handle,
    T: TPropData,
{
    /// The value assigned to newly created elements.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Number of values, which is the number of elements of kind `H` in the
    /// mesh, including deleted ones that haven't been garbage collected.
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.try_borrow()?.buf.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Try to borrow the property with read-only access.
    ///
    /// Properties use interior mutability pattern using a [`RefCell<T>`] to
    /// enforce runtime borrow checking rules. If borrowing fails,
    /// [`Error::BorrowedPropertyAccess`] is returned, otherwise a reference to
    /// the property is returned.
    pub fn try_borrow(&self) -> Result<Ref<PropBuf<H, T>>, Error> {
        self.data
            .try_borrow()
            .map_err(|_| Error::BorrowedPropertyAccess)
    }

    /// Try to borrow the property with mutable access.
    ///
    /// Properties use interior mutability pattern using a [`RefCell<T>`] to
    /// enforce runtime borrow checking rules. If borrowing fails,
    /// [`Error::BorrowedPropertyAccess`] is returned, otherwise a mutable
    /// reference to the property is returned.
    pub fn try_borrow_mut(&mut self) -> Result<RefMut<PropBuf<H, T>>, Error> {
        self.data
            .try_borrow_mut()
            .map_err(|_| Error::BorrowedPropertyAccess)
    }

    /// Get a reference to the property value of the mesh element `h`.
    ///
    /// Returns an error if the property cannot be borrowed, or if `h` doesn't
    /// refer to an element of the mesh.
    pub fn get(&self, h: H) -> Result<Ref<T>, Error> {
        let i = h.index();
        Ref::filter_map(self.try_borrow()?, |v| v.buf.get(i as usize))
            .map_err(|_| Error::OutOfBoundsAccess(i))
    }

    /// Get the cloned property value of the mesh element `h`.
    pub fn get_cloned(&self, h: H) -> Result<T, Error> {
        Ok(self.get(h)?.clone())
    }

    /// Get a mutable reference to the property value of a mesh element.
    ///
    /// Returns an error if the property cannot be mutably borrowed, or if `h`
    /// doesn't refer to an element of the mesh.
    pub fn get_mut(&mut self, h: H) -> Result<RefMut<T>, Error> {
        let i = h.index();
        RefMut::filter_map(self.try_borrow_mut()?, |v| v.buf.get_mut(i as usize))
            .map_err(|_| Error::OutOfBoundsAccess(i))
    }

    /// Set the property value of a mesh element.
    pub fn set(&mut self, h: H, val: T) -> Result<(), Error> {
        (*self.get_mut(h)?) = val;
        Ok(())
    }
}

/// Vertex property. A value of type `T` is defined on each vertex of the
/// mesh.
///
/// See the documentation of [`Property<H, T>`] for more context on how
/// properties work.
///
/// ```rust
/// use halfmesh::{PolyMesh, VH};
///
/// let mut mesh = PolyMesh::new();
/// for _ in 0..3 {
///     mesh.add_vertex(glam::Vec3::ZERO).expect("Cannot add vertex");
/// }
/// // Create a vertex property of type u32, with a default value of 42.
/// let vprop = mesh
///     .add_vertex_property("v:answer", 42u32)
///     .expect("Cannot add property");
/// let v: VH = 2u32.into();
/// assert_eq!(42, vprop.get_cloned(v).expect("Cannot read vertex property"));
/// ```
pub type VProperty<T> = Property<VH, T>;

/// Halfedge property. A value of type `T` is defined on each halfedge of the
/// mesh.
pub type HProperty<T> = Property<HH, T>;

/// Edge property. A value of type `T` is defined on each edge of the
/// mesh.
pub type EProperty<T> = Property<EH, T>;

/// Face property. A value of type `T` is defined on each face of the
/// mesh.
pub type FProperty<T> = Property<FH, T>;

/// Model property. A single value of type `T` attached to the whole mesh,
/// addressed with [`MH`].
pub type MProperty<T> = Property<MH, T>;

/// Buffer containing the values of a vertex property.
pub type VPropBuf<T> = PropBuf<VH, T>;

/// Buffer containing the values of a halfedge property.
pub type HPropBuf<T> = PropBuf<HH, T>;

/// Buffer containing the values of a edge property.
pub type EPropBuf<T> = PropBuf<EH, T>;

/// Buffer containing the values of a face property.
pub type FPropBuf<T> = PropBuf<FH, T>;

/// This is what lives inside the property container. It owns the column
/// together with its name, and can resize, swap and copy the values without
/// the container knowing the value type.
struct Column<H, T>
where
    H: Handle,
    T: TPropData,
{
    name: String,
    data: Rc<RefCell<PropBuf<H, T>>>,
    default: T,
}

impl<H, T> Column<H, T>
where
    H: Handle,
    T: TPropData,
{
    fn property(&self) -> Property<H, T> {
        Property {
            data: Rc::clone(&self.data),
            default: self.default.clone(),
        }
    }

    fn borrow_mut(&self) -> Result<RefMut<PropBuf<H, T>>, Error> {
        self.data
            .try_borrow_mut()
            .map_err(|_| Error::BorrowedPropertyAccess)
    }

    fn with_values(&self, buf: Vec<T>) -> Box<dyn GenericProperty<H>> {
        Box::new(Column::<H, T> {
            name: self.name.clone(),
            data: Rc::new(RefCell::new(PropBuf {
                buf,
                _phantom: PhantomData,
            })),
            default: self.default.clone(),
        })
    }
}

impl<H, T> GenericProperty<H> for Column<H, T>
where
    T: TPropData,
    H: Handle,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn check_borrow(&self) -> Result<(), Error> {
        self.borrow_mut().map(|_| ())
    }

    /**
     * Reserve memory for an additional `n` values.
     */
    fn reserve(&mut self, n: usize) -> Result<(), Error> {
        self.borrow_mut()?.buf.reserve(n);
        Ok(())
    }

    fn resize(&mut self, n: usize) -> Result<(), Error> {
        let default = self.default.clone();
        self.borrow_mut()?.buf.resize(n, default);
        Ok(())
    }

    fn shrink_to_fit(&mut self) -> Result<(), Error> {
        self.borrow_mut()?.buf.shrink_to_fit();
        Ok(())
    }

    fn swap(&mut self, i: usize, j: usize) -> Result<(), Error> {
        self.borrow_mut()?.buf.swap(i, j);
        Ok(())
    }

    fn copy(&mut self, src: usize, dst: usize) -> Result<(), Error> {
        let mut buf = self.borrow_mut()?;
        let val = buf.buf[src].clone();
        buf.buf[dst] = val;
        Ok(())
    }

    fn transfer(&mut self, other: &dyn GenericProperty<H>) -> Result<(), Error> {
        let Some(other) = other.as_any().downcast_ref::<Column<H, T>>() else {
            return Err(Error::DuplicateName(self.name.clone()));
        };
        if Rc::ptr_eq(&self.data, &other.data) {
            return Err(Error::BorrowedPropertyAccess);
        }
        let src = other
            .data
            .try_borrow()
            .map_err(|_| Error::BorrowedPropertyAccess)?;
        let mut dst = self.borrow_mut()?;
        let (n, len) = (src.buf.len(), dst.buf.len());
        if n > len {
            return Err(Error::MismatchedArrayLengths(len, n));
        }
        dst.buf[(len - n)..].clone_from_slice(&src.buf);
        Ok(())
    }

    fn deep_clone(&self) -> Result<Box<dyn GenericProperty<H>>, Error> {
        let buf = self
            .data
            .try_borrow()
            .map_err(|_| Error::BorrowedPropertyAccess)?
            .buf
            .clone();
        Ok(self.with_values(buf))
    }

    fn empty_clone(&self, length: usize) -> Box<dyn GenericProperty<H>> {
        self.with_values(vec![self.default.clone(); length])
    }
}
