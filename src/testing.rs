//! Fixtures shared by unit tests.

use crate::geometry::{Gene, Rgb};
use crate::lineage::{build_census, Census, OrganismAttributes, Variant};
use crate::loader::serialized::{SC_SERIALIZABLE, SC_WRITE_METHOD};

/// A single-arm variant whose silhouette radius equals `length`.
pub(crate) fn variant(length: f64) -> Variant {
    Variant::new(
        vec![Gene {
            rotation: 0.0,
            length,
            branch: 0,
            color: Rgb(200, 10, 10),
        }],
        1,
        false,
    )
}

/// A living organism of the given lineage with a `variant(length)` shape.
pub(crate) fn organism(lineage: &str, length: f64) -> OrganismAttributes {
    OrganismAttributes {
        alive: true,
        lineage: lineage.to_string(),
        variant: variant(length),
    }
}

/// A census where each `(lineage, population)` entry contributes that many
/// organisms of a length-10 variant.
pub(crate) fn census(time: i64, species: &[(&str, u32)]) -> Census {
    census_with_lengths(
        time,
        &species
            .iter()
            .map(|&(lineage, population)| (lineage, population, 10.0))
            .collect::<Vec<_>>(),
    )
}

/// Like [`census`], with an explicit silhouette length per lineage.
pub(crate) fn census_with_lengths(time: i64, species: &[(&str, u32, f64)]) -> Census {
    let organisms = species.iter().flat_map(|&(lineage, population, length)| {
        (0..population).map(move |_| organism(lineage, length))
    });
    build_census(organisms, time).expect("fixture identifiers are well formed")
}

/// Writer for Java object serialization streams, enough to build saves.
///
/// Handles are numbered in write order, as `ObjectOutputStream` does.
pub(crate) struct JavaStream {
    bytes: Vec<u8>,
    next_handle: u32,
}

impl JavaStream {
    /// A stream holding only the header.
    pub(crate) fn new() -> Self {
        Self {
            bytes: vec![0xAC, 0xED, 0x00, 0x05],
            next_handle: 0x7E_0000,
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn utf(&mut self, text: &str) -> &mut Self {
        self.bytes.extend_from_slice(&(text.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(text.as_bytes());
        self
    }

    /// A new string object; returns its handle.
    pub(crate) fn string(&mut self, text: &str) -> u32 {
        self.bytes.push(0x74);
        let handle = self.handle();
        self.utf(text);
        handle
    }

    pub(crate) fn reference(&mut self, handle: u32) -> &mut Self {
        self.bytes.push(0x71);
        self.bytes.extend_from_slice(&handle.to_be_bytes());
        self
    }

    pub(crate) fn null(&mut self) -> &mut Self {
        self.bytes.push(0x70);
        self
    }

    /// Start a new object; a class descriptor and [`Self::object_handle`]
    /// follow.
    pub(crate) fn begin_object(&mut self) -> &mut Self {
        self.bytes.push(0x73);
        self
    }

    /// A new class descriptor up to, not including, its superclass.
    /// Returns its handle.
    pub(crate) fn class_desc(&mut self, name: &str, flags: u8, fields: &[(char, &str)]) -> u32 {
        self.bytes.push(0x72);
        self.utf(name);
        self.bytes.extend_from_slice(&[0; 8]);
        let handle = self.handle();
        self.bytes.push(flags);
        self.bytes.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for &(code, field) in fields {
            self.bytes.push(code as u8);
            self.utf(field);
            if matches!(code, 'L' | '[') {
                self.string("Ljava/lang/Object;");
            }
        }
        self.end();
        handle
    }

    pub(crate) fn object_handle(&mut self) -> u32 {
        self.handle()
    }

    /// A new object of a new class without superclass. Field values follow.
    /// Returns the class and object handles.
    pub(crate) fn new_object(&mut self, name: &str, flags: u8, fields: &[(char, &str)]) -> (u32, u32) {
        self.begin_object();
        let class = self.class_desc(name, flags, fields);
        self.null();
        (class, self.object_handle())
    }

    /// A new object of an already written class. Field values follow.
    pub(crate) fn object(&mut self, class: u32) -> u32 {
        self.begin_object();
        self.reference(class);
        self.object_handle()
    }

    /// An object of `class`, writing the class descriptor the first time.
    pub(crate) fn instance(
        &mut self,
        class: &mut Option<u32>,
        name: &str,
        flags: u8,
        fields: &[(char, &str)],
    ) -> u32 {
        match *class {
            Some(existing) => self.object(existing),
            None => {
                let (new, object) = self.new_object(name, flags, fields);
                *class = Some(new);
                object
            }
        }
    }

    pub(crate) fn int(&mut self, value: i32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub(crate) fn long(&mut self, value: i64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub(crate) fn double(&mut self, value: f64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub(crate) fn boolean(&mut self, value: bool) -> &mut Self {
        self.bytes.push(u8::from(value));
        self
    }

    pub(crate) fn block(&mut self, data: &[u8]) -> &mut Self {
        self.bytes.push(0x77);
        self.bytes.push(data.len() as u8);
        self.bytes.extend_from_slice(data);
        self
    }

    /// End of an annotation.
    pub(crate) fn end(&mut self) -> &mut Self {
        self.bytes.push(0x78);
        self
    }
}

/// A serialized world holding one single-gene organism per
/// `(lineage, alive)` entry, laid out the way the simulation writes it:
/// organisms in a list wrapper that also points back at itself.
pub(crate) fn binary_save(time: i64, organisms: &[(&str, bool)]) -> Vec<u8> {
    let mut stream = JavaStream::new();
    stream.new_object("World", SC_SERIALIZABLE, &[('L', "_organisms"), ('L', "_worldStatistics")]);

    let (_, wrapper) = stream.new_object("OrganismList", SC_SERIALIZABLE, &[('L', "list"), ('L', "mutex")]);
    let (list_class, _) = stream.new_object("java.util.ArrayList", SC_SERIALIZABLE | SC_WRITE_METHOD, &[('I', "size")]);
    stream.int(organisms.len() as i32).block(&(organisms.len() as i32).to_be_bytes());

    let (mut organism, mut code, mut gene, mut color) = (None, None, None, None);
    for &(lineage, alive) in organisms {
        stream.instance(&mut organism, "Organism", SC_SERIALIZABLE, &[('Z', "_alive"), ('L', "_geneticCode")]);
        stream.boolean(alive);
        stream.instance(
            &mut code,
            "GeneticCode",
            SC_SERIALIZABLE,
            &[('I', "_symmetry"), ('Z', "_mirror"), ('L', "_cladeID"), ('L', "_genes")],
        );
        stream.int(2).boolean(false);
        stream.string(lineage);
        stream.object(list_class);
        stream.int(1).block(&1i32.to_be_bytes());
        stream.instance(
            &mut gene,
            "Gene",
            SC_SERIALIZABLE,
            &[('D', "_length"), ('D', "_theta"), ('I', "_branch"), ('L', "_color")],
        );
        stream.double(12.0).double(0.3).int(0);
        stream.instance(&mut color, "java.awt.Color", SC_SERIALIZABLE, &[('I', "value")]);
        stream.int(0x33aa33);
        stream.end();
    }
    stream.end();
    stream.reference(wrapper);

    stream.new_object("WorldStatistics", SC_SERIALIZABLE, &[('J', "_time")]);
    stream.long(time);
    stream.bytes
}
