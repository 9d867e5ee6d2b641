use crate::primary::Primary;

/// One row: an ordered sequence of [`Primary`] whose length must equal the
/// owning [`crate::header::Header`] length (§3 invariant).
#[derive(Debug, Clone)]
pub struct Record {
    values: Vec<Primary>,
}

impl Record {
    pub fn new(values: Vec<Primary>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Primary> {
        self.values.get(idx)
    }

    pub fn set(&mut self, idx: usize, value: Primary) {
        self.values[idx] = value;
    }

    pub fn values(&self) -> &[Primary] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Primary> {
        self.values
    }

    pub fn push(&mut self, value: Primary) {
        self.values.push(value);
    }

    pub fn remove(&mut self, idx: usize) -> Primary {
        self.values.remove(idx)
    }

    pub fn insert(&mut self, idx: usize, value: Primary) {
        self.values.insert(idx, value);
    }
}

/// Every non-base row the engine produces carries, alongside its values, the
/// set of (view name, row index) pairs it was built from. `UPDATE`/`DELETE`
/// use this provenance to map a surviving working row back onto the
/// specific persistent/temporary rows it must mutate or remove, and to
/// detect the ambiguous-assignment case in §4.4.
pub type Provenance = Vec<(String, usize)>;

pub fn base_provenance(view: &str, row: usize) -> Provenance {
    vec![(view.to_string(), row)]
}
