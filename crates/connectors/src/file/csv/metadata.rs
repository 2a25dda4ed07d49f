/// Header names as exposed to the pipeline, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvHeader {
    pub columns: Vec<String>,
}

impl CsvHeader {
    pub fn from_record(record: &csv::StringRecord) -> Self {
        CsvHeader {
            columns: record.iter().map(normalize_col_name).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub fn normalize_col_name(name: &str) -> String {
    name.trim()
        .replace(" ", "_")
        .replace("-", "_")
        .replace(".", "_")
        .replace("(", "_")
        .replace(")", "_")
        .replace(",", "_")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_normalized() {
        let record = csv::StringRecord::from(vec!["Customer Id", " First-Name ", "e.mail"]);
        let header = CsvHeader::from_record(&record);
        assert_eq!(header.columns, vec!["customer_id", "first_name", "e_mail"]);
    }
}
