/// Generates the named property accessors for one kind of element. The
/// container is reached through the field path given as `$($field).+`.
/// Columns listed in `$reserved` are owned by the mesh itself and cannot be
/// removed or renamed through these accessors.
macro_rules! property_api {
    (
        $handle:ty,
        $kind:literal,
        $($field:ident).+,
        reserved: $reserved:expr,
        $add:ident,
        $get:ident,
        $remove:ident,
        $rename:ident,
        $names:ident,
        $type_of:ident
    ) => {
        #[doc = concat!(
            "Add a ", $kind, " property named `name`, with every existing and future ",
            $kind, " initialized to `default`. If a property with this name and type ",
            "already exists, that property is returned. If the name is taken by a ",
            "property of a different type, [`Error::DuplicateName`] is returned."
        )]
        pub fn $add<T: $crate::property::TPropData>(
            &mut self,
            name: &str,
            default: T,
        ) -> Result<$crate::property::Property<$handle, T>, $crate::error::Error> {
            self.$($field).+.add(name, default)
        }

        #[doc = concat!(
            "Look up the ", $kind, " property named `name`. Returns `Ok(None)` if it ",
            "doesn't exist, and [`Error::PropertyTypeMismatch`] if it stores a type ",
            "other than `T`."
        )]
        pub fn $get<T: $crate::property::TPropData>(
            &self,
            name: &str,
        ) -> Result<Option<$crate::property::Property<$handle, T>>, $crate::error::Error> {
            self.$($field).+.get(name)
        }

        #[doc = concat!("Remove the ", $kind, " property named `name`. Returns false if there is no such property.")]
        pub fn $remove(&mut self, name: &str) -> bool {
            let reserved: &[&str] = $reserved;
            if reserved.contains(&name) {
                return false;
            }
            self.$($field).+.remove(name)
        }

        #[doc = concat!("Rename the ", $kind, " property `old` to `new`.")]
        pub fn $rename(&mut self, old: &str, new: &str) -> Result<bool, $crate::error::Error> {
            let reserved: &[&str] = $reserved;
            if reserved.contains(&old) {
                return Ok(false);
            }
            self.$($field).+.rename(old, new)
        }

        #[doc = concat!("Names of all ", $kind, " properties, in the order they were added.")]
        pub fn $names(&self) -> Vec<String> {
            self.$($field).+.names()
        }

        #[doc = concat!("Name of the type stored in the ", $kind, " property `name`, if it exists.")]
        pub fn $type_of(&self, name: &str) -> Option<&'static str> {
            self.$($field).+.type_name(name)
        }
    };
}

pub(crate) use property_api;
