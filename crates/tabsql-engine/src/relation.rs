use tabsql_core::{Header, HeaderField, Provenance, Record, View};

/// The working in-memory relation the SELECT pipeline threads through FROM,
/// WHERE, GROUP BY, projection, ORDER BY, LIMIT/OFFSET. Unlike [`View`] it
/// carries no file identity — it only exists for the duration of one
/// statement's evaluation.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    pub header: Header,
    pub rows: Vec<Record>,
    pub provenance: Vec<Provenance>,
}

impl Relation {
    pub fn new(header: Header, rows: Vec<Record>, provenance: Vec<Provenance>) -> Self {
        Self { header, rows, provenance }
    }

    pub fn from_view(view: &View) -> Self {
        Self {
            header: view.header.clone(),
            rows: view.records.clone(),
            provenance: view.provenance.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Concatenates the fields of two headers into one, renumbering ordinals
    /// 1..=n across the combined row so `#n` resolves positionally across a
    /// join. Columns are never merged even for `USING`/`NATURAL` joins: both
    /// sides' columns survive, qualified by their own view name.
    pub fn concat_headers(left: &Header, right: &Header) -> Header {
        let mut fields: Vec<HeaderField> = Vec::with_capacity(left.len() + right.len());
        fields.extend(left.iter().cloned());
        fields.extend(right.iter().cloned());
        for (i, field) in fields.iter_mut().enumerate() {
            field.ordinal = i + 1;
        }
        Header::new(fields)
    }

    /// Row-wise cross product of `self` and `other`, used as the basis for
    /// every join kind (the caller filters by condition afterward).
    pub fn cross_join(&self, other: &Relation) -> Relation {
        let header = Self::concat_headers(&self.header, &other.header);
        let mut rows = Vec::with_capacity(self.len() * other.len());
        let mut provenance = Vec::with_capacity(self.len() * other.len());
        for (li, lrow) in self.rows.iter().enumerate() {
            for (ri, rrow) in other.rows.iter().enumerate() {
                let mut values = lrow.values().to_vec();
                values.extend(rrow.values().iter().cloned());
                rows.push(Record::new(values));

                let mut prov = self.provenance[li].clone();
                prov.extend(other.provenance[ri].iter().cloned());
                provenance.push(prov);
            }
        }
        Relation::new(header, rows, provenance)
    }

    /// A single row of all-Null values shaped like `other`, used to pad the
    /// unmatched side of an outer join.
    pub fn null_padding(other: &Relation) -> Record {
        Record::new(vec![tabsql_core::Primary::Null; other.width()])
    }
}
