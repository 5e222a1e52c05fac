// Copyright © 2026 Pathway

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use super::error::{Error, Result};
use super::schema::{Field, FieldType, Schema, SchemaId};
use super::sorting::{ComparatorRegistry, FieldComparator, Order, SortElement, Sorting};
use super::translation::{PositionMapping, TranslationCache};

/// Registration index of a source schema. Records of different sources that
/// tie on every common sort field are ordered by it, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u32);

impl SourceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One field of the unified layout, with the ordering it is sorted by, if any.
#[derive(Debug, Clone)]
pub struct LayoutField {
    name: String,
    type_: FieldType,
    order: Option<Order>,
    comparator: Option<Arc<dyn FieldComparator>>,
}

impl LayoutField {
    fn sorted(field: &Field, element: &SortElement, registry: &ComparatorRegistry) -> Result<Self> {
        let comparator = element
            .comparator()
            .map(|name| registry.resolve(name))
            .transpose()?;
        Ok(Self {
            name: field.name().to_string(),
            type_: field.type_().clone(),
            order: Some(element.order()),
            comparator,
        })
    }

    fn unsorted(field: &Field) -> Self {
        Self {
            name: field.name().to_string(),
            type_: field.type_().clone(),
            order: None,
            comparator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_(&self) -> &FieldType {
        &self.type_
    }

    pub fn order(&self) -> Option<Order> {
        self.order
    }

    pub fn comparator(&self) -> Option<&Arc<dyn FieldComparator>> {
        self.comparator.as_ref()
    }

    pub fn is_length_prefixed(&self) -> bool {
        self.comparator.is_some()
    }

    fn to_field(&self) -> Field {
        Field::new(self.name.clone(), self.type_.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SourceLayout {
    id: SourceId,
    schema: Arc<Schema>,
    particular_schema: Arc<Schema>,
    particular_fields: Vec<LayoutField>,
    sorted_len: usize,
    mapping: Arc<PositionMapping>,
}

impl SourceLayout {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn particular_schema(&self) -> &Arc<Schema> {
        &self.particular_schema
    }

    /// Particular sort fields first, then the remaining native fields in native order.
    pub fn particular_fields(&self) -> &[LayoutField] {
        &self.particular_fields
    }

    pub fn particular_sort_fields(&self) -> &[LayoutField] {
        &self.particular_fields[..self.sorted_len]
    }

    pub fn mapping(&self) -> &PositionMapping {
        &self.mapping
    }
}

/// The unified intermediate layout shared by every source.
///
/// A record is laid out as the common sort fields in criteria order, then the
/// source id (only when several sources are registered), then the particular
/// fields of that source.
#[derive(Debug, Clone)]
pub struct Layout {
    common_schema: Arc<Schema>,
    common_fields: Vec<LayoutField>,
    sources: Vec<SourceLayout>,
    by_schema: HashMap<SchemaId, SourceId>,
    by_name: HashMap<String, SourceId>,
}

impl Layout {
    pub(crate) fn build(
        schemas: &[Arc<Schema>],
        sorting: &Sorting,
        registry: &ComparatorRegistry,
        cache: &TranslationCache,
    ) -> Result<Self> {
        let first = schemas.first().ok_or(Error::NoSchemas)?;
        let common_fields = sorting
            .common()
            .elements()
            .iter()
            .map(|element| {
                LayoutField::sorted(first.field_by_name(element.field())?, element, registry)
            })
            .collect::<Result<Vec<_>>>()?;
        let common_schema = Arc::new(Schema::new(
            "common",
            common_fields.iter().map(LayoutField::to_field).collect(),
        )?);

        let mut sources = Vec::with_capacity(schemas.len());
        let mut by_schema = HashMap::with_capacity(schemas.len());
        let mut by_name = HashMap::with_capacity(schemas.len());
        for (index, schema) in schemas.iter().enumerate() {
            let id = SourceId(
                u32::try_from(index)
                    .map_err(|_| Error::InvalidConfig("too many sources".to_string()))?,
            );
            let mut particular_fields = Vec::new();
            if let Some(criteria) = sorting.particular(schema.name()) {
                for element in criteria.elements() {
                    if sorting.common().contains(element.field()) {
                        return Err(Error::ParticularFieldIsCommon {
                            field: element.field().to_string(),
                            schema: schema.name().to_string(),
                        });
                    }
                    let field = schema.field_by_name(element.field())?;
                    particular_fields.push(LayoutField::sorted(field, element, registry)?);
                }
            }
            let sorted_len = particular_fields.len();
            for field in schema.fields() {
                let sorted = sorting.common().contains(field.name())
                    || particular_fields[..sorted_len]
                        .iter()
                        .any(|sorted| sorted.name() == field.name());
                if !sorted {
                    particular_fields.push(LayoutField::unsorted(field));
                }
            }
            let particular_schema = Arc::new(Schema::new(
                format!("{}.particular", schema.name()),
                particular_fields.iter().map(LayoutField::to_field).collect(),
            )?);
            let mapping = cache.get_or_compute(&common_schema, &particular_schema, schema)?;
            by_schema.insert(schema.id(), id);
            by_name.insert(schema.name().to_string(), id);
            sources.push(SourceLayout {
                id,
                schema: schema.clone(),
                particular_schema,
                particular_fields,
                sorted_len,
                mapping,
            });
        }

        Ok(Self {
            common_schema,
            common_fields,
            sources,
            by_schema,
            by_name,
        })
    }

    pub fn common_schema(&self) -> &Arc<Schema> {
        &self.common_schema
    }

    pub fn common_fields(&self) -> &[LayoutField] {
        &self.common_fields
    }

    pub fn sources(&self) -> &[SourceLayout] {
        &self.sources
    }

    pub fn is_multi_source(&self) -> bool {
        self.sources.len() > 1
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceLayout> {
        self.sources.get(id.index())
    }

    pub fn source_by_name(&self, name: &str) -> Result<&SourceLayout> {
        self.by_name
            .get(name)
            .map(|id| &self.sources[id.index()])
            .ok_or_else(|| Error::UnknownSource(name.to_string()))
    }

    /// The source a tuple of `schema` belongs to.
    pub fn source_for(&self, schema: &Schema) -> Result<&SourceLayout> {
        self.by_schema
            .get(&schema.id())
            .map(|id| &self.sources[id.index()])
            .ok_or_else(|| Error::UnknownSource(schema.name().to_string()))
    }
}
