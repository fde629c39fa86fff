use gdal::Dataset;
use gdal::DriverManager;
use gdal::raster::{Buffer, ColorInterpretation};
use std::path::Path;

use crate::io::RasterError;

/// Create a single-band Float64 GeoTIFF with NaN as no-data and write `data`
/// (row-major, `rows * cols` samples) into it. Georeferencing is left to the caller.
pub fn write_tiff_f64(
    output: &Path,
    cols: usize,
    rows: usize,
    data: &[f64],
) -> Result<Dataset, RasterError> {
    if data.len() != cols * rows {
        return Err(RasterError::DimensionMismatch(cols, rows, data.len(), 1));
    }
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let ds = driver.create_with_band_type::<f64, _>(output, cols, rows, 1)?;
    {
        let mut band = ds.rasterband(1)?;
        band.set_color_interpretation(ColorInterpretation::GrayIndex)?;
        band.set_no_data_value(Some(f64::NAN))?;
        let mut buf = Buffer::new((cols, rows), data.to_vec());
        band.write((0, 0), (cols, rows), &mut buf)?;
    }
    Ok(ds)
}
