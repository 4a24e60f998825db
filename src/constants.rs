//! Application constants for the balneability pipeline
//!
//! Endpoint locations, the labels the monitoring service prints inside its
//! report tables, and the fixed column names of the output file.

// =============================================================================
// Remote service
// =============================================================================

/// Base URL of the state environmental agency balneability service
pub const DEFAULT_BASE_URL: &str = "https://balneabilidade.ima.sc.gov.br";

/// Endpoint listing the monitored municipalities (JSON)
pub const CITIES_PATH: &str = "/municipio/getMunicipios";

/// Endpoint listing monitoring locations of one municipality (JSON)
pub const LOCATIONS_PATH: &str = "/local/getlocaisByMunicipio";

/// Endpoint listing the years that have analyses (JSON array of `{"ANO": ..}`)
pub const YEARS_PATH: &str = "/registro/anosAnalisados";

/// Endpoint returning the historical report of one year (HTML)
pub const REPORT_PATH: &str = "/relatorio/historico";

/// Field holding the year in the years endpoint payload
pub const YEAR_FIELD: &str = "ANO";

/// Florianópolis
pub const DEFAULT_CITY_ID: u32 = 2;

/// Sentinel location id meaning "every monitoring point of the city"
pub const ALL_POINTS: u32 = 0;

// =============================================================================
// Report labels
// =============================================================================

/// Label prefixes of the location-detail cells, already lower-cased
pub mod labels {
    pub const MUNICIPALITY: &str = "município:";
    pub const BEACH: &str = "balneário:";
    pub const POINT: &str = "ponto de coleta:";
    pub const POINT_WORD: &str = "ponto";
    pub const LOCATION: &str = "localização:";
}

/// Header texts of the measurement fragments
pub mod report_headers {
    pub const DATE: &str = "Data";
    pub const TIME: &str = "Hora";
    pub const WIND: &str = "Vento";
    pub const TIDE: &str = "Maré";
    pub const RAIN: &str = "Chuva";
    pub const WATER_TEMP: &str = "Agua (Cº)";
    pub const AIR_TEMP: &str = "Ar (Cº)";
    pub const E_COLI: &str = "E.Coli NMP*/100ml";
    pub const CONDITION: &str = "Condição";
}

/// Balneability condition values as printed by the service
pub mod conditions {
    pub const PROPER: &str = "PRÓPRIA";
    pub const IMPROPER: &str = "IMPRÓPRIA";
    pub const INDETERMINATE: &str = "INDETERMINADO";
}

// =============================================================================
// Normalization
// =============================================================================

/// Sampling hour substituted when the report has no (or a corrupt) time
pub const DEFAULT_SAMPLE_TIME: &str = "09:30:00";

/// Known corrupt time literal published by the service
pub const CORRUPT_TIME_LITERAL: &str = "92:07:00";

/// Unit suffix printed after temperatures
pub const TEMPERATURE_UNIT: &str = "Cº";

/// Date layouts accepted in the `Data` column
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Time layouts accepted in the `Hora` column
pub const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Layout of timestamps in the output file
pub const OUTPUT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Output schema
// =============================================================================

/// Output column names
pub mod columns {
    pub const TIMESTAMP: &str = "timestamp";
    pub const POINT_ID: &str = "point_id";
    pub const WIND: &str = "wind";
    pub const TIDE: &str = "tide";
    pub const RAIN: &str = "rain";
    pub const WATER_TEMP: &str = "water_temp_c";
    pub const AIR_TEMP: &str = "air_temp_c";
    pub const E_COLI: &str = "e_coli_count";
    pub const CONDITION: &str = "condition";

    pub const LAT: &str = "lat";
    pub const LONG: &str = "long";
    pub const BALNEARY: &str = "balneary";
    pub const REFERENCE: &str = "reference";
    pub const LOCATION: &str = "location";
    pub const FRESH_WATER: &str = "fresh_water";
    pub const DRENAGE_BEACH: &str = "drenage_beach";
    pub const DRENAGE_POINT: &str = "drenage_point";

    /// Key column of the curated feature file
    pub const FEATURE_KEY: &str = "point";

    /// Measurement columns, in file order
    pub const MEASUREMENT_COLUMNS: &[&str] = &[
        TIMESTAMP, POINT_ID, WIND, TIDE, RAIN, WATER_TEMP, AIR_TEMP, E_COLI, CONDITION,
    ];

    /// Feature columns appended after the measurement columns
    pub const FEATURE_COLUMNS: &[&str] = &[
        LAT,
        LONG,
        BALNEARY,
        REFERENCE,
        LOCATION,
        FRESH_WATER,
        DRENAGE_BEACH,
        DRENAGE_POINT,
    ];

    /// Full output schema (excluding the leading row index)
    pub fn output_columns() -> Vec<&'static str> {
        MEASUREMENT_COLUMNS
            .iter()
            .chain(FEATURE_COLUMNS.iter())
            .copied()
            .collect()
    }
}

/// Output file field separator
pub const OUTPUT_SEPARATOR: u8 = b';';

// =============================================================================
// Summary statistics
// =============================================================================

/// Histogram range and bin count used for e. coli distributions
pub const HISTOGRAM_MAX: f64 = 25_000.0;
pub const HISTOGRAM_BINS: usize = 25;

/// Point label of the grand-total row of the condition table
pub const CONDITION_TOTAL_LABEL: &str = "Total of measures";
